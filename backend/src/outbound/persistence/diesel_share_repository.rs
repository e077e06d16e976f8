//! PostgreSQL-backed `ShareRepository` implementation using Diesel ORM.
//!
//! Workflow transitions are single conditional UPDATEs keyed on the current
//! status, so two racing writers can never both observe success. Joined
//! reads load the page of share rows first and then batch-fetch the
//! participants and prediction summaries they reference.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use pagination::PageParams;
use uuid::Uuid;

use crate::domain::ports::{
    ParticipantSummary, PredictionSummary, ShareRecord, ShareRepository, ShareRepositoryError,
};
use crate::domain::prediction::{PredictionId, RiskLevel};
use crate::domain::share::{
    DoctorResponse, ShareCode, ShareId, ShareMessage, SharedPrediction, SharedPredictionDraft,
    ShareStatus,
};
use crate::domain::user::UserId;

use super::diesel_error_mapping::{
    map_diesel_error_with, map_pool_error_with, unique_violation_constraint,
};
use super::models::{NewSharedPredictionRow, SharedPredictionRow};
use super::pool::{DbPool, PoolError};
use super::schema::{predictions, shared_predictions, users};

/// Status labels occupying the (prediction, doctor) slot.
const ACTIVE_STATUSES: [&str; 2] = ["pending", "viewed"];
/// Status labels a patient may still revoke from. Responded shares stay
/// revocable; only revocation itself is terminal.
const REVOCABLE_STATUSES: [&str; 3] = ["pending", "viewed", "responded"];

/// Diesel-backed implementation of the share repository port.
#[derive(Clone)]
pub struct DieselShareRepository {
    pool: DbPool,
}

impl DieselShareRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ShareRepositoryError {
    map_pool_error_with(error, |message| ShareRepositoryError::connection(message))
}

/// Map Diesel errors, translating unique violations into the collision
/// variants the share service retries or reports as conflicts.
fn map_diesel_error(error: diesel::result::Error) -> ShareRepositoryError {
    match unique_violation_constraint(&error) {
        Some("shared_predictions_share_code_key") => ShareRepositoryError::duplicate_code(),
        Some("shared_predictions_active_slot_idx") => {
            ShareRepositoryError::duplicate_active_share()
        }
        _ => map_diesel_error_with(
            error,
            ShareRepositoryError::query,
            ShareRepositoryError::connection,
        ),
    }
}

fn query_error(message: impl std::fmt::Display) -> ShareRepositoryError {
    ShareRepositoryError::query(message.to_string())
}

fn decode_response(row: &SharedPredictionRow) -> Result<Option<DoctorResponse>, ShareRepositoryError> {
    let (Some(message), Some(responded_at)) = (row.response_message.clone(), row.responded_at)
    else {
        return Ok(None);
    };
    DoctorResponse::new(
        message,
        row.response_recommendations.clone().unwrap_or_default(),
        row.follow_up_required.unwrap_or(false),
        responded_at,
    )
    .map(Some)
    .map_err(query_error)
}

/// Convert a database row into a validated domain share.
fn row_to_share(row: SharedPredictionRow) -> Result<SharedPrediction, ShareRepositoryError> {
    let response = decode_response(&row)?;
    let status = row.status.parse::<ShareStatus>().map_err(query_error)?;
    if status == ShareStatus::Responded && response.is_none() {
        return Err(query_error("responded share row has no response"));
    }
    let message = row
        .message
        .map(ShareMessage::new)
        .transpose()
        .map_err(query_error)?;

    Ok(SharedPrediction::new(SharedPredictionDraft {
        id: ShareId::from_uuid(row.id),
        prediction_id: PredictionId::from_uuid(row.prediction_id),
        patient_id: UserId::from_uuid(row.patient_id),
        doctor_id: UserId::from_uuid(row.doctor_id),
        share_code: ShareCode::parse(&row.share_code).map_err(query_error)?,
        message,
        status,
        viewed_at: row.viewed_at,
        response,
        revoked_at: row.revoked_at,
        expires_at: row.expires_at,
        created_at: row.created_at,
    }))
}

fn share_to_new_row(share: &SharedPrediction) -> NewSharedPredictionRow<'_> {
    NewSharedPredictionRow {
        id: *share.id().as_uuid(),
        prediction_id: *share.prediction_id().as_uuid(),
        patient_id: *share.patient_id().as_uuid(),
        doctor_id: *share.doctor_id().as_uuid(),
        share_code: share.share_code().as_str(),
        message: share.message().map(AsRef::as_ref),
        status: share.status().as_str(),
        expires_at: share.expires_at(),
        created_at: share.created_at(),
    }
}

/// Batch-fetch the participants and prediction summaries a page of share
/// rows references, then assemble the joined records in row order.
async fn load_records(
    conn: &mut AsyncPgConnection,
    rows: Vec<SharedPredictionRow>,
) -> Result<Vec<ShareRecord>, ShareRepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut user_ids: Vec<Uuid> = rows
        .iter()
        .flat_map(|row| [row.patient_id, row.doctor_id])
        .collect();
    user_ids.sort_unstable();
    user_ids.dedup();
    let prediction_ids: Vec<Uuid> = rows.iter().map(|row| row.prediction_id).collect();

    let participants: HashMap<Uuid, ParticipantSummary> = users::table
        .filter(users::id.eq_any(&user_ids))
        .select((users::id, users::full_name, users::specialization))
        .load::<(Uuid, String, Option<String>)>(conn)
        .await
        .map_err(map_diesel_error)?
        .into_iter()
        .map(|(id, full_name, specialization)| {
            (
                id,
                ParticipantSummary {
                    id: UserId::from_uuid(id),
                    full_name,
                    specialization,
                },
            )
        })
        .collect();

    let summaries: HashMap<Uuid, PredictionSummary> = predictions::table
        .filter(predictions::id.eq_any(&prediction_ids))
        .select((
            predictions::id,
            predictions::condition,
            predictions::risk_level,
            predictions::confidence,
            predictions::created_at,
        ))
        .load::<(Uuid, String, String, f64, DateTime<Utc>)>(conn)
        .await
        .map_err(map_diesel_error)?
        .into_iter()
        .map(|(id, condition, risk_level, confidence, created_at)| {
            let summary = risk_level
                .parse::<RiskLevel>()
                .map(|risk_level| PredictionSummary {
                    id: PredictionId::from_uuid(id),
                    condition,
                    risk_level,
                    confidence,
                    created_at,
                })
                .map_err(query_error)?;
            Ok((id, summary))
        })
        .collect::<Result<_, ShareRepositoryError>>()?;

    rows.into_iter()
        .map(|row| {
            let patient = participants
                .get(&row.patient_id)
                .cloned()
                .ok_or_else(|| query_error("share references missing patient"))?;
            let doctor = participants
                .get(&row.doctor_id)
                .cloned()
                .ok_or_else(|| query_error("share references missing doctor"))?;
            let prediction = summaries
                .get(&row.prediction_id)
                .cloned()
                .ok_or_else(|| query_error("share references missing prediction"))?;
            Ok(ShareRecord {
                share: row_to_share(row)?,
                patient,
                doctor,
                prediction,
            })
        })
        .collect()
}

#[async_trait]
impl ShareRepository for DieselShareRepository {
    async fn insert(&self, share: &SharedPrediction) -> Result<(), ShareRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(shared_predictions::table)
            .values(&share_to_new_row(share))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(
        &self,
        id: ShareId,
    ) -> Result<Option<SharedPrediction>, ShareRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = shared_predictions::table
            .filter(shared_predictions::id.eq(id.as_uuid()))
            .select(SharedPredictionRow::as_select())
            .first::<SharedPredictionRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_share).transpose()
    }

    async fn find_by_code(
        &self,
        code: &ShareCode,
    ) -> Result<Option<ShareRecord>, ShareRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = shared_predictions::table
            .filter(shared_predictions::share_code.eq(code.as_str()))
            .select(SharedPredictionRow::as_select())
            .first::<SharedPredictionRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut records = load_records(&mut conn, vec![row]).await?;
        Ok(records.pop())
    }

    async fn active_share_exists(
        &self,
        prediction_id: PredictionId,
        doctor_id: UserId,
    ) -> Result<bool, ShareRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let count: i64 = shared_predictions::table
            .filter(
                shared_predictions::prediction_id
                    .eq(prediction_id.as_uuid())
                    .and(shared_predictions::doctor_id.eq(doctor_id.as_uuid()))
                    .and(shared_predictions::status.eq_any(ACTIVE_STATUSES)),
            )
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(count > 0)
    }

    async fn list_for_patient(
        &self,
        patient_id: UserId,
        params: PageParams,
    ) -> Result<(Vec<ShareRecord>, u64), ShareRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let total: i64 = shared_predictions::table
            .filter(shared_predictions::patient_id.eq(patient_id.as_uuid()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let rows: Vec<SharedPredictionRow> = shared_predictions::table
            .filter(shared_predictions::patient_id.eq(patient_id.as_uuid()))
            .order((
                shared_predictions::created_at.desc(),
                shared_predictions::id.desc(),
            ))
            .offset(params.offset() as i64)
            .limit(i64::from(params.limit()))
            .select(SharedPredictionRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let records = load_records(&mut conn, rows).await?;
        Ok((records, total as u64))
    }

    async fn list_for_doctor(
        &self,
        doctor_id: UserId,
        status: Option<ShareStatus>,
        params: PageParams,
    ) -> Result<(Vec<ShareRecord>, u64), ShareRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // An absent filter matches every status; eq_any keeps one query shape.
        let statuses: Vec<&str> = match status {
            Some(status) => vec![status.as_str()],
            None => vec!["pending", "viewed", "responded", "revoked"],
        };
        let scoped = || {
            shared_predictions::doctor_id
                .eq(doctor_id.as_uuid())
                .and(shared_predictions::status.eq_any(statuses.clone()))
        };

        let total: i64 = shared_predictions::table
            .filter(scoped())
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let rows: Vec<SharedPredictionRow> = shared_predictions::table
            .filter(scoped())
            .order((
                shared_predictions::created_at.desc(),
                shared_predictions::id.desc(),
            ))
            .offset(params.offset() as i64)
            .limit(i64::from(params.limit()))
            .select(SharedPredictionRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let records = load_records(&mut conn, rows).await?;
        Ok((records, total as u64))
    }

    async fn mark_viewed(
        &self,
        id: ShareId,
        viewed_at: DateTime<Utc>,
    ) -> Result<bool, ShareRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let affected = diesel::update(
            shared_predictions::table.filter(
                shared_predictions::id
                    .eq(id.as_uuid())
                    .and(shared_predictions::status.eq(ShareStatus::Pending.as_str())),
            ),
        )
        .set((
            shared_predictions::status.eq(ShareStatus::Viewed.as_str()),
            shared_predictions::viewed_at.eq(viewed_at),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(affected > 0)
    }

    async fn record_response(
        &self,
        id: ShareId,
        response: &DoctorResponse,
    ) -> Result<bool, ShareRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let affected = diesel::update(
            shared_predictions::table.filter(
                shared_predictions::id
                    .eq(id.as_uuid())
                    .and(shared_predictions::status.eq_any(ACTIVE_STATUSES)),
            ),
        )
        .set((
            shared_predictions::status.eq(ShareStatus::Responded.as_str()),
            shared_predictions::response_message.eq(response.message()),
            shared_predictions::response_recommendations.eq(response.recommendations()),
            shared_predictions::follow_up_required.eq(response.follow_up_required()),
            shared_predictions::responded_at.eq(response.responded_at()),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(affected > 0)
    }

    async fn revoke(
        &self,
        id: ShareId,
        patient_id: UserId,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool, ShareRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let affected = diesel::update(
            shared_predictions::table.filter(
                shared_predictions::id
                    .eq(id.as_uuid())
                    .and(shared_predictions::patient_id.eq(patient_id.as_uuid()))
                    .and(shared_predictions::status.eq_any(REVOCABLE_STATUSES)),
            ),
        )
        .set((
            shared_predictions::status.eq(ShareStatus::Revoked.as_str()),
            shared_predictions::revoked_at.eq(revoked_at),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(affected > 0)
    }

    async fn revoke_active_for_prediction(
        &self,
        prediction_id: PredictionId,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64, ShareRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let affected = diesel::update(
            shared_predictions::table.filter(
                shared_predictions::prediction_id
                    .eq(prediction_id.as_uuid())
                    .and(shared_predictions::status.eq_any(ACTIVE_STATUSES)),
            ),
        )
        .set((
            shared_predictions::status.eq(ShareStatus::Revoked.as_str()),
            shared_predictions::revoked_at.eq(revoked_at),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(affected as u64)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for error mapping and row conversion edge cases.

    use chrono::{Duration, Utc};
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    use super::*;

    #[fixture]
    fn pending_row() -> SharedPredictionRow {
        let now = Utc::now();
        SharedPredictionRow {
            id: Uuid::new_v4(),
            prediction_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            share_code: "0123456789abcdef0123456789abcdef".to_owned(),
            message: Some("please take a look".to_owned()),
            status: "pending".to_owned(),
            viewed_at: None,
            response_message: None,
            response_recommendations: None,
            follow_up_required: None,
            responded_at: None,
            revoked_at: None,
            expires_at: now + Duration::days(30),
            created_at: now,
        }
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let repo_err = map_pool_error(PoolError::checkout("connection refused"));

        assert!(matches!(repo_err, ShareRepositoryError::Connection { .. }));
        assert!(repo_err.to_string().contains("connection refused"));
    }

    #[rstest]
    fn diesel_not_found_maps_to_query_error() {
        let repo_err = map_diesel_error(diesel::result::Error::NotFound);

        assert!(matches!(repo_err, ShareRepositoryError::Query { .. }));
        assert!(repo_err.to_string().contains("record not found"));
    }

    #[rstest]
    fn pending_row_converts_to_domain_share(pending_row: SharedPredictionRow) {
        let share = row_to_share(pending_row).expect("valid row converts");
        assert_eq!(share.status(), ShareStatus::Pending);
        assert!(share.response().is_none());
    }

    #[rstest]
    fn responded_row_carries_the_response(mut pending_row: SharedPredictionRow) {
        let responded_at = Utc::now();
        pending_row.status = "responded".to_owned();
        pending_row.viewed_at = Some(responded_at);
        pending_row.response_message = Some("rest and hydrate".to_owned());
        pending_row.response_recommendations = Some(vec!["fluids".to_owned()]);
        pending_row.follow_up_required = Some(true);
        pending_row.responded_at = Some(responded_at);

        let share = row_to_share(pending_row).expect("valid row converts");
        let response = share.response().expect("response present");
        assert_eq!(response.message(), "rest and hydrate");
        assert!(response.follow_up_required());
    }

    #[rstest]
    fn responded_row_without_response_is_rejected(mut pending_row: SharedPredictionRow) {
        pending_row.status = "responded".to_owned();

        let error = row_to_share(pending_row).expect_err("missing response should fail");
        assert!(matches!(error, ShareRepositoryError::Query { .. }));
        assert!(error.to_string().contains("no response"));
    }

    #[rstest]
    fn malformed_share_code_is_rejected(mut pending_row: SharedPredictionRow) {
        pending_row.share_code = "not-hex".to_owned();

        let error = row_to_share(pending_row).expect_err("malformed code should fail");
        assert!(matches!(error, ShareRepositoryError::Query { .. }));
    }

    #[rstest]
    fn unknown_status_is_rejected(mut pending_row: SharedPredictionRow) {
        pending_row.status = "archived".to_owned();

        let error = row_to_share(pending_row).expect_err("unknown status should fail");
        assert!(error.to_string().contains("unknown share status"));
    }
}

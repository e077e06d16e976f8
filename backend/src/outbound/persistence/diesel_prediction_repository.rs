//! PostgreSQL-backed `PredictionRepository` implementation using Diesel ORM.
//!
//! Soft deletion is enforced here: every read filters on `deleted = false`,
//! and deletion itself is a conditional update reporting whether a live row
//! matched.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use diesel::dsl::{avg, count_star};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::PageParams;

use crate::domain::ports::{PredictionRepository, PredictionRepositoryError, PredictionStats};
use crate::domain::prediction::{
    ClinicalInputs, ClinicalInputsDraft, Prediction, PredictionDraft, PredictionId,
    PredictionResult, RiskLevel, Severity, Sex,
};
use crate::domain::user::UserId;

use super::diesel_error_mapping::{map_diesel_error_with, map_pool_error_with};
use super::models::{NewPredictionRow, PredictionRow};
use super::pool::{DbPool, PoolError};
use super::schema::predictions;

/// Diesel-backed implementation of the prediction repository port.
#[derive(Clone)]
pub struct DieselPredictionRepository {
    pool: DbPool,
}

impl DieselPredictionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> PredictionRepositoryError {
    map_pool_error_with(error, |message| {
        PredictionRepositoryError::connection(message)
    })
}

fn map_diesel_error(error: diesel::result::Error) -> PredictionRepositoryError {
    map_diesel_error_with(
        error,
        PredictionRepositoryError::query,
        PredictionRepositoryError::connection,
    )
}

fn query_error(message: impl std::fmt::Display) -> PredictionRepositoryError {
    PredictionRepositoryError::query(message.to_string())
}

fn decode_u16(value: i16, column: &str) -> Result<u16, PredictionRepositoryError> {
    u16::try_from(value).map_err(|_| query_error(format!("negative {column} column")))
}

/// First midnight of the calendar month containing `now`.
fn month_start(now: DateTime<Utc>) -> Result<DateTime<Utc>, PredictionRepositoryError> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .ok_or_else(|| query_error("failed to compute month start"))
}

/// Convert a database row into a validated domain prediction.
fn row_to_prediction(row: PredictionRow) -> Result<Prediction, PredictionRepositoryError> {
    let inputs = ClinicalInputs::new(ClinicalInputsDraft {
        symptoms: row.symptoms,
        age: decode_u16(row.age, "age")?,
        sex: row.sex.parse::<Sex>().map_err(query_error)?,
        systolic_bp: decode_u16(row.systolic_bp, "systolic_bp")?,
        duration_days: decode_u16(row.duration_days, "duration_days")?,
        severity: row.severity.parse::<Severity>().map_err(query_error)?,
    })
    .map_err(query_error)?;

    let result = PredictionResult::new(
        row.condition,
        row.confidence,
        row.risk_level.parse::<RiskLevel>().map_err(query_error)?,
        row.recommendations,
        row.notes,
    )
    .map_err(query_error)?;

    Ok(Prediction::new(PredictionDraft {
        id: PredictionId::from_uuid(row.id),
        patient_id: UserId::from_uuid(row.patient_id),
        inputs,
        result,
        deleted: row.deleted,
        created_at: row.created_at,
    }))
}

fn prediction_to_new_row(prediction: &Prediction) -> NewPredictionRow<'_> {
    let inputs = prediction.inputs();
    let result = prediction.result();
    NewPredictionRow {
        id: *prediction.id().as_uuid(),
        patient_id: *prediction.patient_id().as_uuid(),
        symptoms: inputs.symptoms(),
        age: inputs.age() as i16,
        sex: inputs.sex().as_str(),
        systolic_bp: inputs.systolic_bp() as i16,
        duration_days: inputs.duration_days() as i16,
        severity: inputs.severity().as_str(),
        condition: result.condition(),
        confidence: result.confidence(),
        risk_level: result.risk_level().as_str(),
        recommendations: result.recommendations(),
        notes: result.notes(),
        deleted: prediction.is_deleted(),
        created_at: prediction.created_at(),
    }
}

#[async_trait]
impl PredictionRepository for DieselPredictionRepository {
    async fn insert(&self, prediction: &Prediction) -> Result<(), PredictionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(predictions::table)
            .values(&prediction_to_new_row(prediction))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_active(
        &self,
        id: PredictionId,
        patient_id: UserId,
    ) -> Result<Option<Prediction>, PredictionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = predictions::table
            .filter(
                predictions::id
                    .eq(id.as_uuid())
                    .and(predictions::patient_id.eq(patient_id.as_uuid()))
                    .and(predictions::deleted.eq(false)),
            )
            .select(PredictionRow::as_select())
            .first::<PredictionRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_prediction).transpose()
    }

    async fn list_for_patient(
        &self,
        patient_id: UserId,
        params: PageParams,
    ) -> Result<(Vec<Prediction>, u64), PredictionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let live = || {
            predictions::patient_id
                .eq(patient_id.as_uuid())
                .and(predictions::deleted.eq(false))
        };

        let total: i64 = predictions::table
            .filter(live())
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let rows: Vec<PredictionRow> = predictions::table
            .filter(live())
            .order((predictions::created_at.desc(), predictions::id.desc()))
            .offset(params.offset() as i64)
            .limit(i64::from(params.limit()))
            .select(PredictionRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let items = rows
            .into_iter()
            .map(row_to_prediction)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total as u64))
    }

    async fn mark_deleted(
        &self,
        id: PredictionId,
        patient_id: UserId,
    ) -> Result<bool, PredictionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let affected = diesel::update(
            predictions::table.filter(
                predictions::id
                    .eq(id.as_uuid())
                    .and(predictions::patient_id.eq(patient_id.as_uuid()))
                    .and(predictions::deleted.eq(false)),
            ),
        )
        .set(predictions::deleted.eq(true))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(affected > 0)
    }

    async fn stats_for_patient(
        &self,
        patient_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<PredictionStats, PredictionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let live = || {
            predictions::patient_id
                .eq(patient_id.as_uuid())
                .and(predictions::deleted.eq(false))
        };

        let (total, average_confidence): (i64, Option<f64>) = predictions::table
            .filter(live())
            .select((count_star(), avg(predictions::confidence)))
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let month_start = month_start(now)?;

        let this_month: i64 = predictions::table
            .filter(live().and(predictions::created_at.ge(month_start)))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let risk_counts: Vec<(String, i64)> = predictions::table
            .filter(live())
            .group_by(predictions::risk_level)
            .select((predictions::risk_level, count_star()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let mut stats = PredictionStats {
            total: total as u64,
            this_month: this_month as u64,
            average_confidence,
            ..PredictionStats::default()
        };
        for (level, count) in risk_counts {
            match level.parse::<RiskLevel>().map_err(query_error)? {
                RiskLevel::Low => stats.low_risk = count as u64,
                RiskLevel::Medium => stats.medium_risk = count as u64,
                RiskLevel::High => stats.high_risk = count as u64,
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for error mapping and row conversion edge cases.

    use chrono::Utc;
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    use super::*;

    #[fixture]
    fn valid_row() -> PredictionRow {
        PredictionRow {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            symptoms: vec!["headache".to_owned(), "fever".to_owned()],
            age: 34,
            sex: "female".to_owned(),
            systolic_bp: 118,
            duration_days: 3,
            severity: "moderate".to_owned(),
            condition: "migraine".to_owned(),
            confidence: 0.87,
            risk_level: "medium".to_owned(),
            recommendations: vec!["rest".to_owned()],
            notes: None,
            deleted: false,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let repo_err = map_pool_error(PoolError::checkout("connection refused"));

        assert!(matches!(
            repo_err,
            PredictionRepositoryError::Connection { .. }
        ));
        assert!(repo_err.to_string().contains("connection refused"));
    }

    #[rstest]
    fn month_start_is_the_first_midnight_of_the_month() {
        use chrono::TimeZone;

        let now = Utc
            .with_ymd_and_hms(2024, 6, 15, 13, 45, 0)
            .single()
            .expect("valid timestamp");
        let start = month_start(now).expect("month start computes");
        assert_eq!(
            start,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp")
        );
    }

    #[rstest]
    fn diesel_not_found_maps_to_query_error() {
        let repo_err = map_diesel_error(diesel::result::Error::NotFound);

        assert!(matches!(repo_err, PredictionRepositoryError::Query { .. }));
        assert!(repo_err.to_string().contains("record not found"));
    }

    #[rstest]
    fn valid_row_converts_to_domain_prediction(valid_row: PredictionRow) {
        let prediction = row_to_prediction(valid_row).expect("valid row converts");
        assert_eq!(prediction.result().condition(), "migraine");
        assert_eq!(prediction.result().risk_level(), RiskLevel::Medium);
        assert!(!prediction.is_deleted());
    }

    #[rstest]
    fn unknown_risk_level_is_rejected(mut valid_row: PredictionRow) {
        valid_row.risk_level = "critical".to_owned();

        let error = row_to_prediction(valid_row).expect_err("unknown risk level should fail");
        assert!(matches!(error, PredictionRepositoryError::Query { .. }));
        assert!(error.to_string().contains("unknown risk level"));
    }

    #[rstest]
    fn negative_age_column_is_rejected(mut valid_row: PredictionRow) {
        valid_row.age = -1;

        let error = row_to_prediction(valid_row).expect_err("negative age should fail");
        assert!(error.to_string().contains("age"));
    }

    #[rstest]
    fn out_of_range_confidence_is_rejected(mut valid_row: PredictionRow) {
        valid_row.confidence = 1.2;

        let error = row_to_prediction(valid_row).expect_err("confidence should fail");
        assert!(matches!(error, PredictionRepositoryError::Query { .. }));
    }
}

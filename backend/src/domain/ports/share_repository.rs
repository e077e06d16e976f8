//! Port for share persistence, joined reads, and conditional transitions.
//!
//! Every workflow transition is a single-row conditional update keyed on the
//! share id plus its expected current status, so two racing writers can never
//! both observe success. Adapters report whether the update matched a row;
//! services translate a miss into the caller-facing error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::PageParams;

use crate::domain::prediction::{PredictionId, RiskLevel};
use crate::domain::share::{DoctorResponse, ShareCode, ShareId, SharedPrediction, ShareStatus};
use crate::domain::user::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by share repository adapters.
    pub enum ShareRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "share repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "share repository query failed: {message}",
        /// An active share already exists for this prediction and doctor.
        DuplicateActiveShare =>
            "an active share already exists for this prediction and doctor",
        /// The generated share code collided with an existing one.
        DuplicateCode =>
            "share code collided with an existing share",
    }
}

/// Minimal identity of a share participant, for list and detail payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSummary {
    /// Account id.
    pub id: UserId,
    /// Display name.
    pub full_name: String,
    /// Doctor specialization, absent for patients.
    pub specialization: Option<String>,
}

/// Minimal view of the shared prediction, for list and detail payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSummary {
    /// Prediction id.
    pub id: PredictionId,
    /// Predicted condition name.
    pub condition: String,
    /// Assessed risk band.
    pub risk_level: RiskLevel,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
    /// When the prediction was created.
    pub created_at: DateTime<Utc>,
}

/// A share joined with both participants and its prediction summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareRecord {
    /// The share aggregate.
    pub share: SharedPrediction,
    /// The sharing patient.
    pub patient: ParticipantSummary,
    /// The receiving doctor.
    pub doctor: ParticipantSummary,
    /// The prediction being shared.
    pub prediction: PredictionSummary,
}

/// Port for writing shares and reading joined share views.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShareRepository: Send + Sync {
    /// Persist a new pending share.
    ///
    /// Fails with [`ShareRepositoryError::DuplicateActiveShare`] when an
    /// active share already holds the (prediction, doctor) slot.
    async fn insert(&self, share: &SharedPrediction) -> Result<(), ShareRepositoryError>;

    /// Find a share by id.
    async fn find_by_id(
        &self,
        id: ShareId,
    ) -> Result<Option<SharedPrediction>, ShareRepositoryError>;

    /// Find a share with its joined context by share code.
    async fn find_by_code(
        &self,
        code: &ShareCode,
    ) -> Result<Option<ShareRecord>, ShareRepositoryError>;

    /// Whether an active share holds the (prediction, doctor) slot.
    async fn active_share_exists(
        &self,
        prediction_id: PredictionId,
        doctor_id: UserId,
    ) -> Result<bool, ShareRepositoryError>;

    /// Page through a patient's shares, newest first.
    async fn list_for_patient(
        &self,
        patient_id: UserId,
        params: PageParams,
    ) -> Result<(Vec<ShareRecord>, u64), ShareRepositoryError>;

    /// Page through a doctor's received shares, newest first.
    async fn list_for_doctor(
        &self,
        doctor_id: UserId,
        status: Option<ShareStatus>,
        params: PageParams,
    ) -> Result<(Vec<ShareRecord>, u64), ShareRepositoryError>;

    /// Transition `Pending -> Viewed` and stamp `viewed_at`.
    ///
    /// Returns false when the share was not pending; the first view wins.
    async fn mark_viewed(
        &self,
        id: ShareId,
        viewed_at: DateTime<Utc>,
    ) -> Result<bool, ShareRepositoryError>;

    /// Transition an active share to `Responded` and stamp the response.
    ///
    /// Returns false when the share was no longer respondable.
    async fn record_response(
        &self,
        id: ShareId,
        response: &DoctorResponse,
    ) -> Result<bool, ShareRepositoryError>;

    /// Transition a patient's active share to `Revoked`.
    ///
    /// Owner-scoped; returns false when no matching active row existed.
    async fn revoke(
        &self,
        id: ShareId,
        patient_id: UserId,
        revoked_at: DateTime<Utc>,
    ) -> Result<bool, ShareRepositoryError>;

    /// Revoke every active share of a prediction, returning how many matched.
    async fn revoke_active_for_prediction(
        &self,
        prediction_id: PredictionId,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64, ShareRepositoryError>;
}

/// Fixture implementation for tests that do not exercise shares.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureShareRepository;

#[async_trait]
impl ShareRepository for FixtureShareRepository {
    async fn insert(&self, _share: &SharedPrediction) -> Result<(), ShareRepositoryError> {
        Ok(())
    }

    async fn find_by_id(
        &self,
        _id: ShareId,
    ) -> Result<Option<SharedPrediction>, ShareRepositoryError> {
        Ok(None)
    }

    async fn find_by_code(
        &self,
        _code: &ShareCode,
    ) -> Result<Option<ShareRecord>, ShareRepositoryError> {
        Ok(None)
    }

    async fn active_share_exists(
        &self,
        _prediction_id: PredictionId,
        _doctor_id: UserId,
    ) -> Result<bool, ShareRepositoryError> {
        Ok(false)
    }

    async fn list_for_patient(
        &self,
        _patient_id: UserId,
        _params: PageParams,
    ) -> Result<(Vec<ShareRecord>, u64), ShareRepositoryError> {
        Ok((Vec::new(), 0))
    }

    async fn list_for_doctor(
        &self,
        _doctor_id: UserId,
        _status: Option<ShareStatus>,
        _params: PageParams,
    ) -> Result<(Vec<ShareRecord>, u64), ShareRepositoryError> {
        Ok((Vec::new(), 0))
    }

    async fn mark_viewed(
        &self,
        _id: ShareId,
        _viewed_at: DateTime<Utc>,
    ) -> Result<bool, ShareRepositoryError> {
        Ok(false)
    }

    async fn record_response(
        &self,
        _id: ShareId,
        _response: &DoctorResponse,
    ) -> Result<bool, ShareRepositoryError> {
        Ok(false)
    }

    async fn revoke(
        &self,
        _id: ShareId,
        _patient_id: UserId,
        _revoked_at: DateTime<Utc>,
    ) -> Result<bool, ShareRepositoryError> {
        Ok(false)
    }

    async fn revoke_active_for_prediction(
        &self,
        _prediction_id: PredictionId,
        _revoked_at: DateTime<Utc>,
    ) -> Result<u64, ShareRepositoryError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn fixture_transitions_report_no_match() {
        let repo = FixtureShareRepository;
        let viewed = repo
            .mark_viewed(ShareId::random(), Utc::now())
            .await
            .expect("fixture update succeeds");
        assert!(!viewed);
        let revoked = repo
            .revoke(ShareId::random(), UserId::random(), Utc::now())
            .await
            .expect("fixture update succeeds");
        assert!(!revoked);
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_slot_is_always_free() {
        let repo = FixtureShareRepository;
        let exists = repo
            .active_share_exists(PredictionId::random(), UserId::random())
            .await
            .expect("fixture check succeeds");
        assert!(!exists);
    }

    #[rstest]
    fn duplicate_active_share_has_a_stable_message() {
        let err = ShareRepositoryError::duplicate_active_share();
        assert!(err.to_string().contains("active share"));
    }
}

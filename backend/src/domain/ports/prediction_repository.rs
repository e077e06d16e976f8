//! Port for prediction persistence and aggregate statistics reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::PageParams;

use crate::domain::prediction::{Prediction, PredictionId};
use crate::domain::user::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by prediction repository adapters.
    pub enum PredictionRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "prediction repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "prediction repository query failed: {message}",
    }
}

/// Aggregate statistics over a patient's live predictions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PredictionStats {
    /// Live (non-deleted) predictions in total.
    pub total: u64,
    /// Live predictions created in the current calendar month.
    pub this_month: u64,
    /// Mean model confidence, absent when there are no predictions.
    pub average_confidence: Option<f64>,
    /// Live predictions assessed low risk.
    pub low_risk: u64,
    /// Live predictions assessed medium risk.
    pub medium_risk: u64,
    /// Live predictions assessed high risk.
    pub high_risk: u64,
}

/// Port for writing predictions and reading owner-scoped views.
///
/// Every read excludes soft-deleted rows; a deleted prediction is
/// indistinguishable from one that never existed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// Persist a new prediction.
    async fn insert(&self, prediction: &Prediction) -> Result<(), PredictionRepositoryError>;

    /// Find a live prediction owned by `patient_id`.
    async fn find_active(
        &self,
        id: PredictionId,
        patient_id: UserId,
    ) -> Result<Option<Prediction>, PredictionRepositoryError>;

    /// Page through a patient's live predictions, newest first.
    ///
    /// Returns the page of items together with the total live count.
    async fn list_for_patient(
        &self,
        patient_id: UserId,
        params: PageParams,
    ) -> Result<(Vec<Prediction>, u64), PredictionRepositoryError>;

    /// Soft-delete a live prediction owned by `patient_id`.
    ///
    /// Conditional update; returns false when no matching live row existed.
    async fn mark_deleted(
        &self,
        id: PredictionId,
        patient_id: UserId,
    ) -> Result<bool, PredictionRepositoryError>;

    /// Aggregate statistics over a patient's live predictions.
    ///
    /// The current-month bucket is derived from `now`, which the caller
    /// takes from its clock.
    async fn stats_for_patient(
        &self,
        patient_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<PredictionStats, PredictionRepositoryError>;
}

/// Fixture implementation for tests that do not exercise predictions.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePredictionRepository;

#[async_trait]
impl PredictionRepository for FixturePredictionRepository {
    async fn insert(&self, _prediction: &Prediction) -> Result<(), PredictionRepositoryError> {
        Ok(())
    }

    async fn find_active(
        &self,
        _id: PredictionId,
        _patient_id: UserId,
    ) -> Result<Option<Prediction>, PredictionRepositoryError> {
        Ok(None)
    }

    async fn list_for_patient(
        &self,
        _patient_id: UserId,
        _params: PageParams,
    ) -> Result<(Vec<Prediction>, u64), PredictionRepositoryError> {
        Ok((Vec::new(), 0))
    }

    async fn mark_deleted(
        &self,
        _id: PredictionId,
        _patient_id: UserId,
    ) -> Result<bool, PredictionRepositoryError> {
        Ok(false)
    }

    async fn stats_for_patient(
        &self,
        _patient_id: UserId,
        _now: DateTime<Utc>,
    ) -> Result<PredictionStats, PredictionRepositoryError> {
        Ok(PredictionStats::default())
    }
}

//! Driving port for prediction read operations.

use async_trait::async_trait;
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::prediction::PredictionId;
use crate::domain::user::UserId;

use super::prediction_command::PredictionPayload;
use super::prediction_repository::PredictionStats;

/// Request to fetch one owned prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPredictionRequest {
    pub patient_id: UserId,
    pub prediction_id: PredictionId,
}

/// Response for a single prediction lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPredictionResponse {
    pub prediction: PredictionPayload,
}

/// Request to list a patient's predictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPredictionsRequest {
    pub patient_id: UserId,
    pub params: PageParams,
}

/// Risk-band breakdown inside the stats payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskBreakdownPayload {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

/// Serializable prediction statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionStatsPayload {
    pub total: u64,
    pub this_month: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_confidence: Option<f64>,
    pub risk_levels: RiskBreakdownPayload,
}

impl From<PredictionStats> for PredictionStatsPayload {
    fn from(value: PredictionStats) -> Self {
        Self {
            total: value.total,
            this_month: value.this_month,
            average_confidence: value.average_confidence,
            risk_levels: RiskBreakdownPayload {
                low: value.low_risk,
                medium: value.medium_risk,
                high: value.high_risk,
            },
        }
    }
}

/// Driving port for prediction read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PredictionQuery: Send + Sync {
    /// Fetch one live prediction owned by the requesting patient.
    async fn get_prediction(
        &self,
        request: GetPredictionRequest,
    ) -> Result<GetPredictionResponse, Error>;

    /// List a patient's live predictions, newest first.
    async fn list_predictions(
        &self,
        request: ListPredictionsRequest,
    ) -> Result<Paginated<PredictionPayload>, Error>;

    /// Aggregate statistics over a patient's live predictions.
    async fn prediction_stats(&self, patient_id: UserId)
    -> Result<PredictionStatsPayload, Error>;
}

/// Fixture query implementation for tests that do not exercise predictions.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePredictionQuery;

#[async_trait]
impl PredictionQuery for FixturePredictionQuery {
    async fn get_prediction(
        &self,
        request: GetPredictionRequest,
    ) -> Result<GetPredictionResponse, Error> {
        Err(Error::not_found(format!(
            "prediction {} not found",
            request.prediction_id
        )))
    }

    async fn list_predictions(
        &self,
        request: ListPredictionsRequest,
    ) -> Result<Paginated<PredictionPayload>, Error> {
        Ok(Paginated::assemble(Vec::new(), request.params, 0))
    }

    async fn prediction_stats(
        &self,
        _patient_id: UserId,
    ) -> Result<PredictionStatsPayload, Error> {
        Ok(PredictionStats::default().into())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use crate::domain::ErrorCode;

    use super::*;

    #[tokio::test]
    async fn fixture_get_is_not_found() {
        let query = FixturePredictionQuery;
        let error = query
            .get_prediction(GetPredictionRequest {
                patient_id: UserId::random(),
                prediction_id: PredictionId::random(),
            })
            .await
            .expect_err("fixture rejects lookups");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn fixture_stats_are_empty() {
        let query = FixturePredictionQuery;
        let stats = query
            .prediction_stats(UserId::random())
            .await
            .expect("fixture stats succeed");
        assert_eq!(stats.total, 0);
        assert!(stats.average_confidence.is_none());
    }
}

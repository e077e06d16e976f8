//! Prediction domain services.
//!
//! Implements the prediction driving ports over the prediction repository,
//! with the share repository on hand so a deletion can sweep up the
//! prediction's active shares.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::Paginated;
use serde_json::json;
use tracing::warn;

use crate::domain::Error;
use crate::domain::ports::{
    Clock, CreatePredictionRequest, CreatePredictionResponse, DeletePredictionRequest,
    DeletePredictionResponse, GetPredictionRequest, GetPredictionResponse,
    ListPredictionsRequest, PredictionCommand, PredictionPayload, PredictionQuery,
    PredictionRepository, PredictionRepositoryError, PredictionStatsPayload, ShareRepository,
};
use crate::domain::prediction::{
    ClinicalInputs, Prediction, PredictionDraft, PredictionId, PredictionResult,
};
use crate::domain::user::UserId;

fn map_repository_error(error: PredictionRepositoryError) -> Error {
    match error {
        PredictionRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("prediction repository unavailable: {message}"))
        }
        PredictionRepositoryError::Query { message } => {
            Error::internal(format!("prediction repository error: {message}"))
        }
    }
}

fn prediction_not_found() -> Error {
    Error::not_found("prediction not found")
}

/// Prediction service implementing the command and query driving ports.
#[derive(Clone)]
pub struct PredictionService<P, S, C> {
    prediction_repo: Arc<P>,
    share_repo: Arc<S>,
    clock: Arc<C>,
}

impl<P, S, C> PredictionService<P, S, C> {
    /// Create a new prediction service over its collaborator ports.
    pub fn new(prediction_repo: Arc<P>, share_repo: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            prediction_repo,
            share_repo,
            clock,
        }
    }
}

#[async_trait]
impl<P, S, C> PredictionCommand for PredictionService<P, S, C>
where
    P: PredictionRepository,
    S: ShareRepository,
    C: Clock,
{
    async fn create_prediction(
        &self,
        request: CreatePredictionRequest,
    ) -> Result<CreatePredictionResponse, Error> {
        let inputs = ClinicalInputs::try_from(request.inputs).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({ "field": err.field() }))
        })?;
        let result = PredictionResult::new(
            request.result.condition,
            request.result.confidence,
            request.result.risk_level,
            request.result.recommendations,
            request.result.notes,
        )
        .map_err(|err| Error::invalid_request(err.to_string()))?;

        let prediction = Prediction::new(PredictionDraft {
            id: PredictionId::random(),
            patient_id: request.patient_id,
            inputs,
            result,
            deleted: false,
            created_at: self.clock.now(),
        });
        self.prediction_repo
            .insert(&prediction)
            .await
            .map_err(map_repository_error)?;

        Ok(CreatePredictionResponse {
            prediction: prediction.into(),
        })
    }

    async fn delete_prediction(
        &self,
        request: DeletePredictionRequest,
    ) -> Result<DeletePredictionResponse, Error> {
        let deleted = self
            .prediction_repo
            .mark_deleted(request.prediction_id, request.patient_id)
            .await
            .map_err(map_repository_error)?;
        if !deleted {
            return Err(prediction_not_found());
        }

        // The row is already gone from every read path; a failed sweep only
        // leaves shares to lapse on their own expiry.
        let revoked_shares = match self
            .share_repo
            .revoke_active_for_prediction(request.prediction_id, self.clock.now())
            .await
        {
            Ok(count) => count,
            Err(err) => {
                warn!(prediction_id = %request.prediction_id, error = %err, "cascade revoke failed");
                0
            }
        };

        Ok(DeletePredictionResponse {
            prediction_id: request.prediction_id,
            revoked_shares,
        })
    }
}

#[async_trait]
impl<P, S, C> PredictionQuery for PredictionService<P, S, C>
where
    P: PredictionRepository,
    S: ShareRepository,
    C: Clock,
{
    async fn get_prediction(
        &self,
        request: GetPredictionRequest,
    ) -> Result<GetPredictionResponse, Error> {
        let prediction = self
            .prediction_repo
            .find_active(request.prediction_id, request.patient_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(prediction_not_found)?;
        Ok(GetPredictionResponse {
            prediction: prediction.into(),
        })
    }

    async fn list_predictions(
        &self,
        request: ListPredictionsRequest,
    ) -> Result<Paginated<PredictionPayload>, Error> {
        let (predictions, total) = self
            .prediction_repo
            .list_for_patient(request.patient_id, request.params)
            .await
            .map_err(map_repository_error)?;
        let items = predictions.into_iter().map(PredictionPayload::from).collect();
        Ok(Paginated::assemble(items, request.params, total))
    }

    async fn prediction_stats(
        &self,
        patient_id: UserId,
    ) -> Result<PredictionStatsPayload, Error> {
        let stats = self
            .prediction_repo
            .stats_for_patient(patient_id, self.clock.now())
            .await
            .map_err(map_repository_error)?;
        Ok(stats.into())
    }
}

#[cfg(test)]
#[path = "prediction_service_tests.rs"]
mod tests;

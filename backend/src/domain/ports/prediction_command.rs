//! Driving port for prediction mutations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::prediction::{
    ClinicalInputs, ClinicalInputsDraft, ClinicalInputsError, Prediction, PredictionId, RiskLevel,
    Severity, Sex,
};
use crate::domain::user::UserId;

/// Serializable clinical inputs for driving-port payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalInputsPayload {
    pub symptoms: Vec<String>,
    pub age: u16,
    pub sex: Sex,
    pub systolic_bp: u16,
    pub duration_days: u16,
    pub severity: Severity,
}

impl TryFrom<ClinicalInputsPayload> for ClinicalInputs {
    type Error = ClinicalInputsError;

    fn try_from(value: ClinicalInputsPayload) -> Result<Self, Self::Error> {
        ClinicalInputs::new(ClinicalInputsDraft {
            symptoms: value.symptoms,
            age: value.age,
            sex: value.sex,
            systolic_bp: value.systolic_bp,
            duration_days: value.duration_days,
            severity: value.severity,
        })
    }
}

impl From<&ClinicalInputs> for ClinicalInputsPayload {
    fn from(value: &ClinicalInputs) -> Self {
        Self {
            symptoms: value.symptoms().to_vec(),
            age: value.age(),
            sex: value.sex(),
            systolic_bp: value.systolic_bp(),
            duration_days: value.duration_days(),
            severity: value.severity(),
        }
    }
}

/// Serializable model assessment for driving-port payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResultPayload {
    pub condition: String,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Serializable prediction for driving-port payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionPayload {
    pub id: PredictionId,
    pub inputs: ClinicalInputsPayload,
    pub result: PredictionResultPayload,
    pub created_at: DateTime<Utc>,
}

impl From<Prediction> for PredictionPayload {
    fn from(value: Prediction) -> Self {
        Self {
            id: value.id(),
            inputs: value.inputs().into(),
            result: PredictionResultPayload {
                condition: value.result().condition().to_owned(),
                confidence: value.result().confidence(),
                risk_level: value.result().risk_level(),
                recommendations: value.result().recommendations().to_vec(),
                notes: value.result().notes().map(str::to_owned),
            },
            created_at: value.created_at(),
        }
    }
}

/// Request to record a prediction for a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePredictionRequest {
    pub patient_id: UserId,
    pub inputs: ClinicalInputsPayload,
    pub result: PredictionResultPayload,
}

/// Response from recording a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePredictionResponse {
    pub prediction: PredictionPayload,
}

/// Request to soft-delete a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePredictionRequest {
    pub patient_id: UserId,
    pub prediction_id: PredictionId,
}

/// Response from soft-deleting a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletePredictionResponse {
    pub prediction_id: PredictionId,
    /// Active shares of the prediction that were revoked alongside it.
    pub revoked_shares: u64,
}

/// Driving port for prediction write operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PredictionCommand: Send + Sync {
    /// Validate and record a prediction.
    ///
    /// Input violations are InvalidRequest with the failing field named in
    /// the error details.
    async fn create_prediction(
        &self,
        request: CreatePredictionRequest,
    ) -> Result<CreatePredictionResponse, Error>;

    /// Soft-delete an owned prediction and revoke its active shares.
    async fn delete_prediction(
        &self,
        request: DeletePredictionRequest,
    ) -> Result<DeletePredictionResponse, Error>;
}

/// Fixture command implementation for tests that do not exercise predictions.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePredictionCommand;

#[async_trait]
impl PredictionCommand for FixturePredictionCommand {
    async fn create_prediction(
        &self,
        request: CreatePredictionRequest,
    ) -> Result<CreatePredictionResponse, Error> {
        let CreatePredictionRequest { inputs, result, .. } = request;
        ClinicalInputs::try_from(inputs.clone())
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        Ok(CreatePredictionResponse {
            prediction: PredictionPayload {
                id: PredictionId::random(),
                inputs,
                result,
                created_at: Utc::now(),
            },
        })
    }

    async fn delete_prediction(
        &self,
        _request: DeletePredictionRequest,
    ) -> Result<DeletePredictionResponse, Error> {
        Err(Error::not_found("prediction not found"))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use crate::domain::ErrorCode;

    use super::*;

    fn sample_request() -> CreatePredictionRequest {
        CreatePredictionRequest {
            patient_id: UserId::random(),
            inputs: ClinicalInputsPayload {
                symptoms: vec!["cough".into()],
                age: 40,
                sex: Sex::Male,
                systolic_bp: 120,
                duration_days: 5,
                severity: Severity::Mild,
            },
            result: PredictionResultPayload {
                condition: "common cold".into(),
                confidence: 0.8,
                risk_level: RiskLevel::Low,
                recommendations: vec!["rest".into()],
                notes: None,
            },
        }
    }

    #[tokio::test]
    async fn fixture_create_validates_inputs() {
        let command = FixturePredictionCommand;
        let mut request = sample_request();
        request.inputs.symptoms.clear();
        let error = command
            .create_prediction(request)
            .await
            .expect_err("invalid inputs");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn fixture_create_echoes_valid_inputs() {
        let command = FixturePredictionCommand;
        let response = command
            .create_prediction(sample_request())
            .await
            .expect("fixture create succeeds");
        assert_eq!(response.prediction.inputs.symptoms, vec!["cough"]);
    }
}

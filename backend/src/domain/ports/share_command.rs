//! Driving port for share workflow mutations.
//!
//! Covers every state-changing operation of the share lifecycle: creation,
//! the first-view transition, the doctor's response, and revocation. Viewing
//! lives here rather than in the query port because the first view stamps
//! `viewed_at`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::prediction::{PredictionId, RiskLevel};
use crate::domain::share::{ShareId, ShareStatus};
use crate::domain::user::UserId;

use super::share_repository::{ParticipantSummary, PredictionSummary, ShareRecord};

/// Serializable share participant for driving-port payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPayload {
    pub id: UserId,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

impl From<ParticipantSummary> for ParticipantPayload {
    fn from(value: ParticipantSummary) -> Self {
        Self {
            id: value.id,
            full_name: value.full_name,
            specialization: value.specialization,
        }
    }
}

/// Serializable prediction summary for driving-port payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionSummaryPayload {
    pub id: PredictionId,
    pub condition: String,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl From<PredictionSummary> for PredictionSummaryPayload {
    fn from(value: PredictionSummary) -> Self {
        Self {
            id: value.id,
            condition: value.condition,
            risk_level: value.risk_level,
            confidence: value.confidence,
            created_at: value.created_at,
        }
    }
}

/// Serializable doctor response for driving-port payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorResponsePayload {
    pub message: String,
    pub recommendations: Vec<String>,
    pub follow_up_required: bool,
    pub responded_at: DateTime<Utc>,
}

/// Serializable share with joined context for driving-port payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharePayload {
    pub id: ShareId,
    pub share_code: String,
    pub status: ShareStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub patient: ParticipantPayload,
    pub doctor: ParticipantPayload,
    pub prediction: PredictionSummaryPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<DoctorResponsePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<ShareRecord> for SharePayload {
    fn from(value: ShareRecord) -> Self {
        let ShareRecord {
            share,
            patient,
            doctor,
            prediction,
        } = value;
        Self {
            id: share.id(),
            share_code: share.share_code().as_str().to_owned(),
            status: share.status(),
            message: share.message().map(|m| m.as_ref().to_owned()),
            patient: patient.into(),
            doctor: doctor.into(),
            prediction: prediction.into(),
            viewed_at: share.viewed_at(),
            response: share.response().map(|r| DoctorResponsePayload {
                message: r.message().to_owned(),
                recommendations: r.recommendations().to_vec(),
                follow_up_required: r.follow_up_required(),
                responded_at: r.responded_at(),
            }),
            revoked_at: share.revoked_at(),
            expires_at: share.expires_at(),
            created_at: share.created_at(),
        }
    }
}

/// Request to share a prediction with a doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    pub patient_id: UserId,
    pub prediction_id: PredictionId,
    pub doctor_email: String,
    pub message: Option<String>,
}

/// Response from creating a share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareResponse {
    pub share: SharePayload,
}

/// Request to open a share through its code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewShareRequest {
    pub doctor_id: UserId,
    pub code: String,
}

/// Response from opening a share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewShareResponse {
    pub share: SharePayload,
}

/// Request to answer a shared prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondToShareRequest {
    pub doctor_id: UserId,
    pub code: String,
    pub message: String,
    pub recommendations: Vec<String>,
    pub follow_up_required: bool,
}

/// Response from answering a share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondToShareResponse {
    pub share: SharePayload,
}

/// Request to withdraw a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeShareRequest {
    pub patient_id: UserId,
    pub share_id: ShareId,
}

/// Response from withdrawing a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokeShareResponse {
    pub share_id: ShareId,
    pub status: ShareStatus,
    pub revoked_at: DateTime<Utc>,
}

/// Driving port for share write operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShareCommand: Send + Sync {
    /// Share a live prediction with a verified doctor.
    ///
    /// Fails Conflict when the (prediction, doctor) slot is already held by
    /// an active share, and NotFound when the prediction or doctor cannot be
    /// used.
    async fn create_share(&self, request: CreateShareRequest)
    -> Result<CreateShareResponse, Error>;

    /// Open a share by code as its addressee.
    ///
    /// The first successful view transitions `Pending -> Viewed`; later
    /// views return the share unchanged. Wrong doctor, revoked, or expired
    /// shares are NotFound.
    async fn view_share(&self, request: ViewShareRequest) -> Result<ViewShareResponse, Error>;

    /// Record the doctor's response on an active share.
    async fn respond_to_share(
        &self,
        request: RespondToShareRequest,
    ) -> Result<RespondToShareResponse, Error>;

    /// Withdraw an active share as its owning patient.
    ///
    /// Revoking an already-revoked share is NotFound, not a no-op.
    async fn revoke_share(&self, request: RevokeShareRequest)
    -> Result<RevokeShareResponse, Error>;
}

/// Fixture command implementation for tests that do not exercise shares.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureShareCommand;

#[async_trait]
impl ShareCommand for FixtureShareCommand {
    async fn create_share(
        &self,
        _request: CreateShareRequest,
    ) -> Result<CreateShareResponse, Error> {
        Err(Error::not_found("prediction not found"))
    }

    async fn view_share(&self, _request: ViewShareRequest) -> Result<ViewShareResponse, Error> {
        Err(Error::not_found("share not found"))
    }

    async fn respond_to_share(
        &self,
        _request: RespondToShareRequest,
    ) -> Result<RespondToShareResponse, Error> {
        Err(Error::not_found("share not found"))
    }

    async fn revoke_share(
        &self,
        _request: RevokeShareRequest,
    ) -> Result<RevokeShareResponse, Error> {
        Err(Error::not_found("share not found"))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use crate::domain::ErrorCode;

    use super::*;

    #[tokio::test]
    async fn fixture_view_is_not_found() {
        let command = FixtureShareCommand;
        let error = command
            .view_share(ViewShareRequest {
                doctor_id: UserId::random(),
                code: "0".repeat(32),
            })
            .await
            .expect_err("fixture rejects views");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn fixture_revoke_is_not_found() {
        let command = FixtureShareCommand;
        let error = command
            .revoke_share(RevokeShareRequest {
                patient_id: UserId::random(),
                share_id: ShareId::random(),
            })
            .await
            .expect_err("fixture rejects revocations");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }
}

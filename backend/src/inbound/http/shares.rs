//! Share workflow HTTP handlers.
//!
//! ```text
//! POST   /api/v1/shares
//! GET    /api/v1/shares/mine
//! GET    /api/v1/shares/received
//! GET    /api/v1/shares/view/{code}
//! POST   /api/v1/shares/respond/{code}
//! PATCH  /api/v1/shares/revoke/{id}
//! ```
//!
//! Patients create, list, and revoke; doctors view, list, and respond. The
//! share code in view and respond paths is the capability: handlers never
//! reveal whether a code exists for anyone but its addressee.

use std::str::FromStr;

use actix_web::{HttpResponse, get, patch, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::share::{ShareId, ShareStatus};
use crate::domain::{Error, PredictionId};
use crate::domain::ports::{
    CreateShareRequest, ListDoctorSharesRequest, ListPatientSharesRequest, RespondToShareRequest,
    RevokeShareRequest, RevokeShareResponse, SharePayload, ViewShareRequest,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, PageMetaBody};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, PageQuery, parse_uuid};

/// Request payload for sharing a prediction with a doctor.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareBody {
    #[schema(format = "uuid")]
    pub prediction_id: String,
    pub doctor_email: String,
    /// Optional note to the doctor, at most 500 characters.
    pub message: Option<String>,
}

/// Request payload for answering a shared prediction.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RespondBody {
    /// Assessment text, at most 2000 characters.
    pub message: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub follow_up_required: bool,
}

/// One page of shares.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareListBody {
    pub items: Vec<SharePayload>,
    pub pagination: PageMetaBody,
}

/// Status filter accepted by the received-shares listing.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedSharesQuery {
    /// Restrict to one workflow status.
    pub status: Option<String>,
    /// 1-based page number; defaults to 1.
    pub page: Option<u32>,
    /// Page size; defaults to 10 and is clamped to 50.
    pub limit: Option<u32>,
}

fn parse_status_filter(raw: Option<String>) -> Result<Option<ShareStatus>, Error> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    ShareStatus::from_str(&raw).map(Some).map_err(|_| {
        Error::invalid_request("status must be pending, viewed, responded, or revoked")
            .with_details(json!({
                "field": "status",
                "value": raw,
                "code": "invalid_status",
            }))
    })
}

/// Share a prediction with a doctor by email.
#[utoipa::path(
    post,
    path = "/api/v1/shares",
    request_body = CreateShareBody,
    responses(
        (status = 201, description = "Share created", body = SharePayload),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 403, description = "Caller is not a patient", body = ErrorSchema),
        (status = 404, description = "Prediction or verified doctor not found", body = ErrorSchema),
        (status = 409, description = "An active share for this pair already exists", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["shares"],
    operation_id = "createShare",
    security(("SessionCookie" = []))
)]
#[post("/shares")]
pub async fn create_share(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateShareBody>,
) -> ApiResult<HttpResponse> {
    let patient_id = session.require_patient()?;
    let CreateShareBody {
        prediction_id,
        doctor_email,
        message,
    } = payload.into_inner();
    let prediction_id =
        PredictionId::from_uuid(parse_uuid(&prediction_id, FieldName::new("predictionId"))?);

    let response = state
        .shares
        .create_share(CreateShareRequest {
            patient_id,
            prediction_id,
            doctor_email,
            message,
        })
        .await?;

    Ok(HttpResponse::Created().json(response.share))
}

/// List shares created by the authenticated patient, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/shares/mine",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of shares", body = ShareListBody),
        (status = 400, description = "Invalid pagination", body = ErrorSchema),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 403, description = "Caller is not a patient", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["shares"],
    operation_id = "listMyShares",
    security(("SessionCookie" = []))
)]
#[get("/shares/mine")]
pub async fn list_my_shares(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<ShareListBody>> {
    let patient_id = session.require_patient()?;
    let params = query.into_inner().into_params()?;

    let page = state
        .shares_query
        .list_for_patient(ListPatientSharesRequest { patient_id, params })
        .await?;

    Ok(web::Json(ShareListBody {
        items: page.items,
        pagination: page.pagination.into(),
    }))
}

/// List shares addressed to the authenticated doctor, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/shares/received",
    params(ReceivedSharesQuery),
    responses(
        (status = 200, description = "One page of shares", body = ShareListBody),
        (status = 400, description = "Invalid pagination or status filter", body = ErrorSchema),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 403, description = "Caller is not a doctor", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["shares"],
    operation_id = "listReceivedShares",
    security(("SessionCookie" = []))
)]
#[get("/shares/received")]
pub async fn list_received_shares(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ReceivedSharesQuery>,
) -> ApiResult<web::Json<ShareListBody>> {
    let doctor_id = session.require_doctor()?;
    let ReceivedSharesQuery {
        status,
        page,
        limit,
    } = query.into_inner();
    let status = parse_status_filter(status)?;
    let params = PageQuery { page, limit }.into_params()?;

    let page = state
        .shares_query
        .list_for_doctor(ListDoctorSharesRequest {
            doctor_id,
            status,
            params,
        })
        .await?;

    Ok(web::Json(ShareListBody {
        items: page.items,
        pagination: page.pagination.into(),
    }))
}

/// Open a share by code as its addressee.
///
/// The first successful view moves the share from pending to viewed; later
/// views return it unchanged.
#[utoipa::path(
    get,
    path = "/api/v1/shares/view/{code}",
    params(
        ("code" = String, Path, description = "32-character share code")
    ),
    responses(
        (status = 200, description = "The share", body = SharePayload),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 403, description = "Caller is not a doctor", body = ErrorSchema),
        (status = 404, description = "Unknown code, wrong addressee, revoked, or expired", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["shares"],
    operation_id = "viewShare",
    security(("SessionCookie" = []))
)]
#[get("/shares/view/{code}")]
pub async fn view_share(
    state: web::Data<HttpState>,
    session: SessionContext,
    code: web::Path<String>,
) -> ApiResult<web::Json<SharePayload>> {
    let doctor_id = session.require_doctor()?;

    let response = state
        .shares
        .view_share(ViewShareRequest {
            doctor_id,
            code: code.into_inner(),
        })
        .await?;

    Ok(web::Json(response.share))
}

/// Record the doctor's response on an active share.
#[utoipa::path(
    post,
    path = "/api/v1/shares/respond/{code}",
    request_body = RespondBody,
    params(
        ("code" = String, Path, description = "32-character share code")
    ),
    responses(
        (status = 200, description = "Response recorded", body = SharePayload),
        (status = 400, description = "Invalid response payload", body = ErrorSchema),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 403, description = "Caller is not a doctor", body = ErrorSchema),
        (status = 404, description = "Unknown code, wrong addressee, or share no longer active", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["shares"],
    operation_id = "respondToShare",
    security(("SessionCookie" = []))
)]
#[post("/shares/respond/{code}")]
pub async fn respond_to_share(
    state: web::Data<HttpState>,
    session: SessionContext,
    code: web::Path<String>,
    payload: web::Json<RespondBody>,
) -> ApiResult<web::Json<SharePayload>> {
    let doctor_id = session.require_doctor()?;
    let RespondBody {
        message,
        recommendations,
        follow_up_required,
    } = payload.into_inner();

    let response = state
        .shares
        .respond_to_share(RespondToShareRequest {
            doctor_id,
            code: code.into_inner(),
            message,
            recommendations,
            follow_up_required,
        })
        .await?;

    Ok(web::Json(response.share))
}

/// Withdraw a share the authenticated patient created.
#[utoipa::path(
    patch,
    path = "/api/v1/shares/revoke/{id}",
    params(
        ("id" = uuid::Uuid, Path, description = "Share identifier")
    ),
    responses(
        (status = 200, description = "Share revoked", body = RevokeShareResponse),
        (status = 400, description = "Malformed identifier", body = ErrorSchema),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 403, description = "Caller is not a patient", body = ErrorSchema),
        (status = 404, description = "Not found, not owned, or already settled", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["shares"],
    operation_id = "revokeShare",
    security(("SessionCookie" = []))
)]
#[patch("/shares/revoke/{id}")]
pub async fn revoke_share(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<RevokeShareResponse>> {
    let patient_id = session.require_patient()?;
    let share_id = ShareId::from_uuid(parse_uuid(&path.into_inner(), FieldName::new("id"))?);

    let response = state
        .shares
        .revoke_share(RevokeShareRequest {
            patient_id,
            share_id,
        })
        .await?;

    Ok(web::Json(response))
}

#[cfg(test)]
#[path = "shares_tests.rs"]
mod tests;

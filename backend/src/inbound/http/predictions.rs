//! Prediction HTTP handlers.
//!
//! ```text
//! POST   /api/v1/predictions
//! GET    /api/v1/predictions
//! GET    /api/v1/predictions/stats
//! GET    /api/v1/predictions/{id}
//! DELETE /api/v1/predictions/{id}
//! ```
//!
//! All routes are patient-gated; doctors reach predictions only through
//! shares.

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::PredictionId;
use crate::domain::ports::{
    ClinicalInputsPayload, CreatePredictionRequest, DeletePredictionRequest,
    DeletePredictionResponse, GetPredictionRequest, ListPredictionsRequest, PredictionPayload,
    PredictionResultPayload, PredictionStatsPayload,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, PageMetaBody};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, PageQuery, parse_uuid};

/// Request payload for recording a prediction.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePredictionBody {
    pub inputs: ClinicalInputsPayload,
    pub result: PredictionResultPayload,
}

/// One page of predictions.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionListBody {
    pub items: Vec<PredictionPayload>,
    pub pagination: PageMetaBody,
}

/// Record a prediction for the authenticated patient.
#[utoipa::path(
    post,
    path = "/api/v1/predictions",
    request_body = CreatePredictionBody,
    responses(
        (status = 201, description = "Prediction recorded", body = PredictionPayload),
        (status = 400, description = "Clinical inputs fail validation", body = ErrorSchema),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 403, description = "Caller is not a patient", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["predictions"],
    operation_id = "createPrediction",
    security(("SessionCookie" = []))
)]
#[post("/predictions")]
pub async fn create_prediction(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreatePredictionBody>,
) -> ApiResult<HttpResponse> {
    let patient_id = session.require_patient()?;
    let CreatePredictionBody { inputs, result } = payload.into_inner();

    let response = state
        .predictions
        .create_prediction(CreatePredictionRequest {
            patient_id,
            inputs,
            result,
        })
        .await?;

    Ok(HttpResponse::Created().json(response.prediction))
}

/// List the authenticated patient's predictions, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/predictions",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of predictions", body = PredictionListBody),
        (status = 400, description = "Invalid pagination", body = ErrorSchema),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 403, description = "Caller is not a patient", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["predictions"],
    operation_id = "listPredictions",
    security(("SessionCookie" = []))
)]
#[get("/predictions")]
pub async fn list_predictions(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<PredictionListBody>> {
    let patient_id = session.require_patient()?;
    let params = query.into_inner().into_params()?;

    let page = state
        .predictions_query
        .list_predictions(ListPredictionsRequest { patient_id, params })
        .await?;

    Ok(web::Json(PredictionListBody {
        items: page.items,
        pagination: page.pagination.into(),
    }))
}

/// Aggregate statistics over the authenticated patient's predictions.
#[utoipa::path(
    get,
    path = "/api/v1/predictions/stats",
    responses(
        (status = 200, description = "Prediction statistics", body = PredictionStatsPayload),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 403, description = "Caller is not a patient", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["predictions"],
    operation_id = "predictionStats",
    security(("SessionCookie" = []))
)]
#[get("/predictions/stats")]
pub async fn prediction_stats(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<PredictionStatsPayload>> {
    let patient_id = session.require_patient()?;
    let stats = state.predictions_query.prediction_stats(patient_id).await?;
    Ok(web::Json(stats))
}

/// Fetch one prediction owned by the authenticated patient.
#[utoipa::path(
    get,
    path = "/api/v1/predictions/{id}",
    params(
        ("id" = uuid::Uuid, Path, description = "Prediction identifier")
    ),
    responses(
        (status = 200, description = "The prediction", body = PredictionPayload),
        (status = 400, description = "Malformed identifier", body = ErrorSchema),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 403, description = "Caller is not a patient", body = ErrorSchema),
        (status = 404, description = "Not found or not owned by the caller", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["predictions"],
    operation_id = "getPrediction",
    security(("SessionCookie" = []))
)]
#[get("/predictions/{id}")]
pub async fn get_prediction(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<PredictionPayload>> {
    let patient_id = session.require_patient()?;
    let prediction_id =
        PredictionId::from_uuid(parse_uuid(&path.into_inner(), FieldName::new("id"))?);

    let response = state
        .predictions_query
        .get_prediction(GetPredictionRequest {
            patient_id,
            prediction_id,
        })
        .await?;

    Ok(web::Json(response.prediction))
}

/// Soft-delete one of the authenticated patient's predictions.
///
/// Active shares of the prediction are revoked alongside it; the response
/// reports how many.
#[utoipa::path(
    delete,
    path = "/api/v1/predictions/{id}",
    params(
        ("id" = uuid::Uuid, Path, description = "Prediction identifier")
    ),
    responses(
        (status = 200, description = "Prediction deleted", body = DeletePredictionResponse),
        (status = 400, description = "Malformed identifier", body = ErrorSchema),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 403, description = "Caller is not a patient", body = ErrorSchema),
        (status = 404, description = "Not found or not owned by the caller", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["predictions"],
    operation_id = "deletePrediction",
    security(("SessionCookie" = []))
)]
#[delete("/predictions/{id}")]
pub async fn delete_prediction(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<DeletePredictionResponse>> {
    let patient_id = session.require_patient()?;
    let prediction_id =
        PredictionId::from_uuid(parse_uuid(&path.into_inner(), FieldName::new("id"))?);

    let response = state
        .predictions
        .delete_prediction(DeletePredictionRequest {
            patient_id,
            prediction_id,
        })
        .await?;

    Ok(web::Json(response))
}

#[cfg(test)]
#[path = "predictions_tests.rs"]
mod tests;

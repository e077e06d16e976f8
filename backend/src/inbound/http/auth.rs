//! Account and session HTTP handlers.
//!
//! ```text
//! POST /api/v1/auth/register
//! POST /api/v1/auth/verify-otp
//! POST /api/v1/auth/resend-otp
//! POST /api/v1/auth/login
//! POST /api/v1/auth/logout
//! GET  /api/v1/auth/me
//! POST /api/v1/auth/forgot-password
//! POST /api/v1/auth/reset-password/{token}
//! ```
//!
//! Login, verify-otp, and logout are the only places the session cookie is
//! written; every other handler merely reads it.

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    LoginRequest, RegisterRequest, ResetPasswordRequest, UserPayload, VerifyOtpRequest,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Body carrying a bare email address.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailBody {
    pub email: String,
}

/// Body for completing a password reset; the token travels in the path.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordBody {
    pub new_password: String,
}

/// Register a new patient or doctor account.
///
/// The account starts unverified; a one-time code is mailed to the given
/// address and must be confirmed via `verify-otp` before login succeeds.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification code mailed", body = UserPayload),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Username, email, or license already taken", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "register"
)]
#[post("/auth/register")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.register(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

/// Confirm a fresh account with its emailed one-time code.
///
/// A successful verification also establishes a session, so the caller does
/// not have to log in again straight after.
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Account verified, session established", body = UserPayload),
        (status = 401, description = "Wrong or expired code", body = ErrorSchema),
        (status = 409, description = "Account already verified", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "verifyOtp"
)]
#[post("/auth/verify-otp")]
pub async fn verify_otp(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<VerifyOtpRequest>,
) -> ApiResult<web::Json<UserPayload>> {
    let user = state.accounts.verify_otp(payload.into_inner()).await?;
    session.persist_identity(&user)?;
    Ok(web::Json(user))
}

/// Rotate and re-mail the verification code for an unverified account.
#[utoipa::path(
    post,
    path = "/api/v1/auth/resend-otp",
    request_body = EmailBody,
    responses(
        (status = 204, description = "Fresh code mailed"),
        (status = 404, description = "No such unverified account", body = ErrorSchema),
        (status = 409, description = "Account already verified", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "resendOtp"
)]
#[post("/auth/resend-otp")]
pub async fn resend_otp(
    state: web::Data<HttpState>,
    payload: web::Json<EmailBody>,
) -> ApiResult<HttpResponse> {
    state.accounts.resend_otp(payload.into_inner().email).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Log in with a username or email and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established", body = UserPayload),
        (status = 401, description = "Invalid credentials or unverified account", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "login"
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<UserPayload>> {
    let user = state.accounts.login(payload.into_inner()).await?;
    session.persist_identity(&user)?;
    Ok(web::Json(user))
}

/// Drop the caller's session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared"),
        (status = 401, description = "No active session", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "logout",
    security(("SessionCookie" = []))
)]
#[post("/auth/logout")]
pub async fn logout(session: SessionContext) -> ApiResult<HttpResponse> {
    session.require()?;
    session.purge();
    Ok(HttpResponse::NoContent().finish())
}

/// The profile behind the caller's session.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current profile", body = UserPayload),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "currentUser",
    security(("SessionCookie" = []))
)]
#[get("/auth/me")]
pub async fn me(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<UserPayload>> {
    let user = session.require()?;
    let payload = state.accounts.current_user(user.id).await?;
    Ok(web::Json(payload))
}

/// Start a password reset.
///
/// Always answers 204 so the existence of an address never leaks.
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = EmailBody,
    responses(
        (status = 204, description = "Reset link mailed when the address is known"),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "forgotPassword"
)]
#[post("/auth/forgot-password")]
pub async fn forgot_password(
    state: web::Data<HttpState>,
    payload: web::Json<EmailBody>,
) -> ApiResult<HttpResponse> {
    state
        .accounts
        .forgot_password(payload.into_inner().email)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Complete a password reset with the mailed token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password/{token}",
    request_body = ResetPasswordBody,
    params(
        ("token" = String, Path, description = "Reset token from the emailed link")
    ),
    responses(
        (status = 204, description = "Password replaced"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unknown or expired token", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "resetPassword"
)]
#[post("/auth/reset-password/{token}")]
pub async fn reset_password(
    state: web::Data<HttpState>,
    token: web::Path<String>,
    payload: web::Json<ResetPasswordBody>,
) -> ApiResult<HttpResponse> {
    state
        .accounts
        .reset_password(ResetPasswordRequest {
            token: token.into_inner(),
            new_password: payload.into_inner().new_password,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;

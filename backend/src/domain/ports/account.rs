//! Driving port for account registration, verification, and credentials.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::user::{User, UserId};

/// Doctor attributes inside account payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfilePayload {
    pub specialization: String,
    pub license_number: String,
    pub experience_years: u8,
}

/// Role selection at registration time; admins are provisioned out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RegistrationProfile {
    /// Register as a patient.
    Patient,
    /// Register as a doctor; all fields are mandatory.
    Doctor(DoctorProfilePayload),
}

/// Serializable account view for driving-port payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_profile: Option<DoctorProfilePayload>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserPayload {
    fn from(value: &User) -> Self {
        Self {
            id: value.id(),
            username: value.username().as_ref().to_owned(),
            email: value.email().as_ref().to_owned(),
            full_name: value.full_name().as_ref().to_owned(),
            role: value.profile().role_name().to_owned(),
            doctor_profile: value.profile().doctor().map(|d| DoctorProfilePayload {
                specialization: d.specialization().to_owned(),
                license_number: d.license_number().to_owned(),
                experience_years: d.experience_years(),
            }),
            verified: value.is_verified(),
            created_at: value.created_at(),
        }
    }
}

/// Request to register an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: RegistrationProfile,
}

/// Request to verify a fresh account with an emailed code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

/// Request to log in with a username or email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// Request to reset a forgotten password with an emailed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Driving port for account operations.
///
/// Sessions themselves live in the HTTP adapter; this port only settles who
/// the caller is and what state their account is in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Register an unverified account and mail a verification code.
    async fn register(&self, request: RegisterRequest) -> Result<UserPayload, Error>;

    /// Verify an account with its emailed code.
    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<UserPayload, Error>;

    /// Rotate and re-mail the verification code for an unverified account.
    async fn resend_otp(&self, email: String) -> Result<(), Error>;

    /// Check credentials for a verified account.
    ///
    /// Logging into an unverified account fails Unauthorized after a fresh
    /// code is mailed.
    async fn login(&self, request: LoginRequest) -> Result<UserPayload, Error>;

    /// The profile behind an established session.
    async fn current_user(&self, user_id: UserId) -> Result<UserPayload, Error>;

    /// Mail a password-reset link when the address belongs to an account.
    ///
    /// Always succeeds from the caller's perspective; existence never leaks.
    async fn forgot_password(&self, email: String) -> Result<(), Error>;

    /// Replace the password using an unexpired reset token.
    async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), Error>;
}

/// Fixture account implementation for tests that do not exercise accounts.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureAccountService;

#[async_trait]
impl AccountService for FixtureAccountService {
    async fn register(&self, _request: RegisterRequest) -> Result<UserPayload, Error> {
        Err(Error::service_unavailable("registration unavailable"))
    }

    async fn verify_otp(&self, _request: VerifyOtpRequest) -> Result<UserPayload, Error> {
        Err(Error::unauthorized("verification code is not valid"))
    }

    async fn resend_otp(&self, _email: String) -> Result<(), Error> {
        Ok(())
    }

    async fn login(&self, _request: LoginRequest) -> Result<UserPayload, Error> {
        Err(Error::unauthorized("invalid credentials"))
    }

    async fn current_user(&self, _user_id: UserId) -> Result<UserPayload, Error> {
        Err(Error::unauthorized("no session"))
    }

    async fn forgot_password(&self, _email: String) -> Result<(), Error> {
        Ok(())
    }

    async fn reset_password(&self, _request: ResetPasswordRequest) -> Result<(), Error> {
        Err(Error::unauthorized("reset token is not valid"))
    }
}

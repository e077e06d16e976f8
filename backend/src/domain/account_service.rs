//! Account domain service.
//!
//! Implements the account driving port over the user repository, password
//! hasher, and mailer. Credential failures and unknown identities collapse
//! into the same Unauthorized error so probes learn nothing.

use std::sync::Arc;

use async_trait::async_trait;
use rand::thread_rng;
use tracing::warn;

use crate::domain::Error;
use crate::domain::notifications;
use crate::domain::otp::{OtpChallenge, ResetChallenge};
use crate::domain::ports::{
    AccountService, Clock, LoginRequest, Mailer, PasswordHasher, PasswordHasherError,
    RegisterRequest, RegistrationProfile, ResetPasswordRequest, UserPayload, UserRepository,
    UserRepositoryError, VerifyOtpRequest,
};
use crate::domain::user::{
    DoctorProfile, Email, FullName, PasswordHash, Profile, User, UserDraft, UserId, Username,
};

/// Minimum accepted password length.
pub const PASSWORD_MIN: usize = 8;

fn map_repository_error(error: UserRepositoryError) -> Error {
    match error {
        UserRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserRepositoryError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserRepositoryError::DuplicateKey { field } => {
            Error::conflict(format!("{field} is already registered"))
        }
    }
}

fn map_hasher_error(error: PasswordHasherError) -> Error {
    Error::internal(format!("password hashing failed: {error}"))
}

fn invalid_credentials() -> Error {
    Error::unauthorized("invalid credentials")
}

fn validate_password(password: &str) -> Result<(), Error> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(Error::invalid_request(format!(
            "password must be at least {PASSWORD_MIN} characters"
        )));
    }
    Ok(())
}

/// Account service implementing the account driving port.
#[derive(Clone)]
pub struct UserAccountService<U, H, M, C> {
    user_repo: Arc<U>,
    hasher: Arc<H>,
    mailer: Arc<M>,
    clock: Arc<C>,
    frontend_url: String,
}

impl<U, H, M, C> UserAccountService<U, H, M, C> {
    /// Create a new account service over its collaborator ports.
    pub fn new(
        user_repo: Arc<U>,
        hasher: Arc<H>,
        mailer: Arc<M>,
        clock: Arc<C>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            user_repo,
            hasher,
            mailer,
            clock,
            frontend_url: frontend_url.into(),
        }
    }
}

impl<U, H, M, C> UserAccountService<U, H, M, C>
where
    U: UserRepository,
    H: PasswordHasher,
    M: Mailer,
    C: Clock,
{
    /// Rotate the verification challenge and mail the fresh code.
    async fn issue_and_mail_otp(&self, user: &mut User) -> Result<(), Error> {
        let (code, challenge) = OtpChallenge::issue(&mut thread_rng(), self.clock.now());
        user.set_otp(Some(challenge));
        self.user_repo
            .update(user)
            .await
            .map_err(map_repository_error)?;
        let email = notifications::verification_email(user, &code);
        if let Err(err) = self.mailer.send(&email).await {
            warn!(user_id = %user.id(), error = %err, "verification email failed");
        }
        Ok(())
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, Error> {
        if identifier.contains('@') {
            let Ok(email) = Email::new(identifier) else {
                return Ok(None);
            };
            self.user_repo
                .find_by_email(&email)
                .await
                .map_err(map_repository_error)
        } else {
            let Ok(username) = Username::new(identifier) else {
                return Ok(None);
            };
            self.user_repo
                .find_by_username(&username)
                .await
                .map_err(map_repository_error)
        }
    }
}

#[async_trait]
impl<U, H, M, C> AccountService for UserAccountService<U, H, M, C>
where
    U: UserRepository,
    H: PasswordHasher,
    M: Mailer,
    C: Clock,
{
    async fn register(&self, request: RegisterRequest) -> Result<UserPayload, Error> {
        let username = Username::new(&request.username)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let email =
            Email::new(&request.email).map_err(|err| Error::invalid_request(err.to_string()))?;
        let full_name = FullName::new(request.full_name)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        validate_password(&request.password)?;
        let profile = match request.profile {
            RegistrationProfile::Patient => Profile::Patient,
            RegistrationProfile::Doctor(doctor) => Profile::Doctor(
                DoctorProfile::new(
                    doctor.specialization,
                    doctor.license_number,
                    doctor.experience_years,
                )
                .map_err(|err| Error::invalid_request(err.to_string()))?,
            ),
        };

        if self
            .user_repo
            .find_by_email(&email)
            .await
            .map_err(map_repository_error)?
            .is_some()
        {
            return Err(Error::conflict("email is already registered"));
        }
        if self
            .user_repo
            .find_by_username(&username)
            .await
            .map_err(map_repository_error)?
            .is_some()
        {
            return Err(Error::conflict("username is already taken"));
        }
        if let Some(doctor) = profile.doctor()
            && self
                .user_repo
                .license_number_exists(doctor.license_number())
                .await
                .map_err(map_repository_error)?
        {
            return Err(Error::conflict("license number is already registered"));
        }

        let password_hash = self
            .hasher
            .hash(&request.password)
            .await
            .map_err(map_hasher_error)?;
        let now = self.clock.now();
        let (code, challenge) = OtpChallenge::issue(&mut thread_rng(), now);
        let user = User::new(UserDraft {
            id: UserId::random(),
            username,
            email,
            full_name,
            password_hash,
            profile,
            verified: false,
            otp: Some(challenge),
            reset: None,
            created_at: now,
        });

        self.user_repo
            .insert(&user)
            .await
            .map_err(map_repository_error)?;

        let email = notifications::verification_email(&user, &code);
        if let Err(err) = self.mailer.send(&email).await {
            warn!(user_id = %user.id(), error = %err, "verification email failed");
        }

        Ok(UserPayload::from(&user))
    }

    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<UserPayload, Error> {
        let email =
            Email::new(&request.email).map_err(|err| Error::invalid_request(err.to_string()))?;
        let mut user = self
            .user_repo
            .find_by_email(&email)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::unauthorized("verification code is not valid"))?;
        if user.is_verified() {
            return Err(Error::conflict("account is already verified"));
        }
        let challenge = user
            .otp()
            .ok_or_else(|| Error::unauthorized("verification code is not valid"))?;
        if challenge.is_expired(self.clock.now()) {
            return Err(Error::unauthorized("verification code has expired"));
        }
        if !challenge.matches(&request.code) {
            return Err(Error::unauthorized("verification code is not valid"));
        }

        user.mark_verified();
        self.user_repo
            .update(&user)
            .await
            .map_err(map_repository_error)?;

        let message = notifications::welcome_email(&user, &self.frontend_url);
        if let Err(err) = self.mailer.send(&message).await {
            warn!(user_id = %user.id(), error = %err, "welcome email failed");
        }

        Ok(UserPayload::from(&user))
    }

    async fn resend_otp(&self, email: String) -> Result<(), Error> {
        let email = Email::new(&email).map_err(|err| Error::invalid_request(err.to_string()))?;
        let mut user = self
            .user_repo
            .find_by_email(&email)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("account not found"))?;
        if user.is_verified() {
            return Err(Error::conflict("account is already verified"));
        }
        self.issue_and_mail_otp(&mut user).await
    }

    async fn login(&self, request: LoginRequest) -> Result<UserPayload, Error> {
        let mut user = self
            .find_by_identifier(&request.identifier)
            .await?
            .ok_or_else(invalid_credentials)?;
        let credentials_match = self
            .hasher
            .verify(&request.password, user.password_hash())
            .await
            .map_err(map_hasher_error)?;
        if !credentials_match {
            return Err(invalid_credentials());
        }
        if !user.is_verified() {
            self.issue_and_mail_otp(&mut user).await?;
            return Err(Error::unauthorized(
                "account is not verified; a new verification code has been sent",
            ));
        }
        Ok(UserPayload::from(&user))
    }

    async fn current_user(&self, user_id: UserId) -> Result<UserPayload, Error> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::unauthorized("session user no longer exists"))?;
        Ok(UserPayload::from(&user))
    }

    async fn forgot_password(&self, email: String) -> Result<(), Error> {
        let email = Email::new(&email).map_err(|err| Error::invalid_request(err.to_string()))?;
        // Unknown addresses succeed silently; existence never leaks.
        let Some(mut user) = self
            .user_repo
            .find_by_email(&email)
            .await
            .map_err(map_repository_error)?
        else {
            return Ok(());
        };

        let (token, challenge) = ResetChallenge::issue(&mut thread_rng(), self.clock.now());
        user.set_reset(Some(challenge));
        self.user_repo
            .update(&user)
            .await
            .map_err(map_repository_error)?;
        let message = notifications::password_reset_email(&user, &self.frontend_url, &token);
        if let Err(err) = self.mailer.send(&message).await {
            warn!(user_id = %user.id(), error = %err, "reset email failed");
        }
        Ok(())
    }

    async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), Error> {
        validate_password(&request.new_password)?;
        let digest = ResetChallenge::digest(&request.token);
        let mut user = self
            .user_repo
            .find_by_reset_hash(&digest)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::unauthorized("reset token is not valid"))?;
        let expired = user
            .reset()
            .is_none_or(|challenge| challenge.is_expired(self.clock.now()));
        if expired {
            return Err(Error::unauthorized("reset token has expired"));
        }

        let password_hash: PasswordHash = self
            .hasher
            .hash(&request.new_password)
            .await
            .map_err(map_hasher_error)?;
        user.set_password_hash(password_hash);
        user.set_reset(None);
        self.user_repo
            .update(&user)
            .await
            .map_err(map_repository_error)
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;

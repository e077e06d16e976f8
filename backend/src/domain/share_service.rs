//! Share workflow domain services.
//!
//! Implements the share driving ports over the share, prediction, and user
//! repositories. Every transition is delegated to the repository as a
//! conditional update; a missed update is reported to the caller as
//! NotFound, never retried blindly.

use std::sync::Arc;

use rand::thread_rng;
use tracing::warn;

use async_trait::async_trait;
use pagination::Paginated;

use crate::domain::Error;
use crate::domain::notifications;
use crate::domain::ports::{
    Clock, CreateShareRequest, CreateShareResponse, ListDoctorSharesRequest,
    ListPatientSharesRequest, Mailer, ParticipantSummary, PredictionRepository,
    PredictionRepositoryError, PredictionSummary, RespondToShareRequest, RespondToShareResponse,
    RevokeShareRequest, RevokeShareResponse, ShareCommand, SharePayload, ShareQuery, ShareRecord,
    ShareRepository, ShareRepositoryError, UserRepository, UserRepositoryError, ViewShareRequest,
    ViewShareResponse,
};
use crate::domain::share::{
    DoctorResponse, ShareCode, ShareId, ShareMessage, SharedPrediction, SharedPredictionDraft,
    ShareStatus, share_ttl,
};
use crate::domain::user::{Email, User, UserId};

/// Attempts to persist a share before a code collision is treated as fatal.
const CODE_RETRIES: usize = 3;

fn map_share_repository_error(error: ShareRepositoryError) -> Error {
    match error {
        ShareRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("share repository unavailable: {message}"))
        }
        ShareRepositoryError::Query { message } => {
            Error::internal(format!("share repository error: {message}"))
        }
        ShareRepositoryError::DuplicateActiveShare => {
            Error::conflict("this prediction is already shared with this doctor")
        }
        ShareRepositoryError::DuplicateCode => {
            Error::internal("share code collision persisted after retries")
        }
    }
}

fn map_prediction_repository_error(error: PredictionRepositoryError) -> Error {
    match error {
        PredictionRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("prediction repository unavailable: {message}"))
        }
        PredictionRepositoryError::Query { message } => {
            Error::internal(format!("prediction repository error: {message}"))
        }
    }
}

fn map_user_repository_error(error: UserRepositoryError) -> Error {
    match error {
        UserRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserRepositoryError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserRepositoryError::DuplicateKey { field } => {
            Error::conflict(format!("duplicate {field}"))
        }
    }
}

fn share_not_found() -> Error {
    Error::not_found("share not found")
}

fn participant_summary(user: &User) -> ParticipantSummary {
    ParticipantSummary {
        id: user.id(),
        full_name: user.full_name().as_ref().to_owned(),
        specialization: user
            .profile()
            .doctor()
            .map(|d| d.specialization().to_owned()),
    }
}

/// Share service implementing the command and query driving ports.
#[derive(Clone)]
pub struct ShareService<S, P, U, M, C> {
    share_repo: Arc<S>,
    prediction_repo: Arc<P>,
    user_repo: Arc<U>,
    mailer: Arc<M>,
    clock: Arc<C>,
    frontend_url: String,
}

impl<S, P, U, M, C> ShareService<S, P, U, M, C> {
    /// Create a new share service over its collaborator ports.
    pub fn new(
        share_repo: Arc<S>,
        prediction_repo: Arc<P>,
        user_repo: Arc<U>,
        mailer: Arc<M>,
        clock: Arc<C>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            share_repo,
            prediction_repo,
            user_repo,
            mailer,
            clock,
            frontend_url: frontend_url.into(),
        }
    }
}

impl<S, P, U, M, C> ShareService<S, P, U, M, C>
where
    S: ShareRepository,
    P: PredictionRepository,
    U: UserRepository,
    M: Mailer,
    C: Clock,
{
    async fn require_user(&self, id: UserId) -> Result<User, Error> {
        self.user_repo
            .find_by_id(id)
            .await
            .map_err(map_user_repository_error)?
            .ok_or_else(|| Error::internal(format!("user {id} missing for share")))
    }

    /// Load a share by code and check it is usable by this doctor right now.
    async fn load_for_doctor(
        &self,
        code: &str,
        doctor_id: UserId,
    ) -> Result<ShareRecord, Error> {
        // Malformed codes are indistinguishable from unknown ones.
        let code = ShareCode::parse(code).map_err(|_| share_not_found())?;
        let record = self
            .share_repo
            .find_by_code(&code)
            .await
            .map_err(map_share_repository_error)?
            .ok_or_else(share_not_found)?;
        if !record.share.is_addressed_to(doctor_id) {
            return Err(share_not_found());
        }
        if !record.share.status().allows_view() {
            return Err(share_not_found());
        }
        if record.share.is_expired(self.clock.now()) {
            return Err(share_not_found());
        }
        Ok(record)
    }

    async fn reload_by_code(&self, code: &ShareCode) -> Result<ShareRecord, Error> {
        self.share_repo
            .find_by_code(code)
            .await
            .map_err(map_share_repository_error)?
            .ok_or_else(share_not_found)
    }
}

#[async_trait]
impl<S, P, U, M, C> ShareCommand for ShareService<S, P, U, M, C>
where
    S: ShareRepository,
    P: PredictionRepository,
    U: UserRepository,
    M: Mailer,
    C: Clock,
{
    async fn create_share(
        &self,
        request: CreateShareRequest,
    ) -> Result<CreateShareResponse, Error> {
        let doctor_email = Email::new(&request.doctor_email)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let message = request
            .message
            .map(ShareMessage::new)
            .transpose()
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        let prediction = self
            .prediction_repo
            .find_active(request.prediction_id, request.patient_id)
            .await
            .map_err(map_prediction_repository_error)?
            .ok_or_else(|| Error::not_found("prediction not found"))?;

        let doctor = self
            .user_repo
            .find_by_email(&doctor_email)
            .await
            .map_err(map_user_repository_error)?
            .filter(User::is_eligible_doctor)
            .ok_or_else(|| Error::not_found("doctor not found"))?;

        if self
            .share_repo
            .active_share_exists(prediction.id(), doctor.id())
            .await
            .map_err(map_share_repository_error)?
        {
            return Err(Error::conflict(
                "this prediction is already shared with this doctor",
            ));
        }

        let patient = self.require_user(request.patient_id).await?;
        let now = self.clock.now();

        // The store's unique code index is authoritative; collisions only
        // cost another attempt.
        let mut attempt = 0;
        let share = loop {
            let share = SharedPrediction::new(SharedPredictionDraft {
                id: ShareId::random(),
                prediction_id: prediction.id(),
                patient_id: patient.id(),
                doctor_id: doctor.id(),
                share_code: ShareCode::generate(&mut thread_rng()),
                message: message.clone(),
                status: ShareStatus::Pending,
                viewed_at: None,
                response: None,
                revoked_at: None,
                expires_at: now + share_ttl(),
                created_at: now,
            });
            match self.share_repo.insert(&share).await {
                Ok(()) => break share,
                Err(ShareRepositoryError::DuplicateCode) if attempt + 1 < CODE_RETRIES => {
                    attempt += 1;
                }
                Err(err) => return Err(map_share_repository_error(err)),
            }
        };

        let email = notifications::share_created_email(
            &doctor,
            patient.full_name().as_ref(),
            prediction.result().condition(),
            &self.frontend_url,
            share.share_code(),
        );
        if let Err(err) = self.mailer.send(&email).await {
            warn!(share_id = %share.id(), error = %err, "share notification failed");
        }

        let record = ShareRecord {
            patient: participant_summary(&patient),
            doctor: participant_summary(&doctor),
            prediction: PredictionSummary {
                id: prediction.id(),
                condition: prediction.result().condition().to_owned(),
                risk_level: prediction.result().risk_level(),
                confidence: prediction.result().confidence(),
                created_at: prediction.created_at(),
            },
            share,
        };
        Ok(CreateShareResponse {
            share: record.into(),
        })
    }

    async fn view_share(&self, request: ViewShareRequest) -> Result<ViewShareResponse, Error> {
        let record = self
            .load_for_doctor(&request.code, request.doctor_id)
            .await?;

        // First view wins the Pending -> Viewed race; a miss means another
        // request already stamped it.
        if record.share.status() == ShareStatus::Pending {
            let stamped = self
                .share_repo
                .mark_viewed(record.share.id(), self.clock.now())
                .await
                .map_err(map_share_repository_error)?;
            if !stamped {
                warn!(share_id = %record.share.id(), "lost first-view race");
            }
            let reloaded = self.reload_by_code(record.share.share_code()).await?;
            if !reloaded.share.status().allows_view() {
                return Err(share_not_found());
            }
            return Ok(ViewShareResponse {
                share: reloaded.into(),
            });
        }

        Ok(ViewShareResponse {
            share: record.into(),
        })
    }

    async fn respond_to_share(
        &self,
        request: RespondToShareRequest,
    ) -> Result<RespondToShareResponse, Error> {
        let now = self.clock.now();
        let response = DoctorResponse::new(
            request.message,
            request.recommendations,
            request.follow_up_required,
            now,
        )
        .map_err(|err| Error::invalid_request(err.to_string()))?;

        let record = self
            .load_for_doctor(&request.code, request.doctor_id)
            .await?;
        if !record.share.status().allows_respond() {
            return Err(share_not_found());
        }

        let recorded = self
            .share_repo
            .record_response(record.share.id(), &response)
            .await
            .map_err(map_share_repository_error)?;
        if !recorded {
            return Err(share_not_found());
        }

        match self.require_user(record.share.patient_id()).await {
            Ok(patient) => {
                let email = notifications::share_responded_email(
                    &patient,
                    &record.doctor.full_name,
                    &record.prediction.condition,
                    &self.frontend_url,
                );
                if let Err(err) = self.mailer.send(&email).await {
                    warn!(share_id = %record.share.id(), error = %err, "response notification failed");
                }
            }
            Err(err) => {
                warn!(share_id = %record.share.id(), error = %err, "patient lookup for notification failed");
            }
        }

        let reloaded = self.reload_by_code(record.share.share_code()).await?;
        Ok(RespondToShareResponse {
            share: reloaded.into(),
        })
    }

    async fn revoke_share(
        &self,
        request: RevokeShareRequest,
    ) -> Result<RevokeShareResponse, Error> {
        let share = self
            .share_repo
            .find_by_id(request.share_id)
            .await
            .map_err(map_share_repository_error)?
            .ok_or_else(share_not_found)?;
        if !share.is_owned_by(request.patient_id) {
            return Err(share_not_found());
        }
        if !share.status().allows_revoke() {
            // Re-revoking is a miss, not a no-op. Answered shares stay
            // revocable.
            return Err(share_not_found());
        }

        let now = self.clock.now();
        let revoked = self
            .share_repo
            .revoke(share.id(), request.patient_id, now)
            .await
            .map_err(map_share_repository_error)?;
        if !revoked {
            return Err(share_not_found());
        }

        Ok(RevokeShareResponse {
            share_id: share.id(),
            status: ShareStatus::Revoked,
            revoked_at: now,
        })
    }
}

#[async_trait]
impl<S, P, U, M, C> ShareQuery for ShareService<S, P, U, M, C>
where
    S: ShareRepository,
    P: PredictionRepository,
    U: UserRepository,
    M: Mailer,
    C: Clock,
{
    async fn list_for_patient(
        &self,
        request: ListPatientSharesRequest,
    ) -> Result<Paginated<SharePayload>, Error> {
        let (records, total) = self
            .share_repo
            .list_for_patient(request.patient_id, request.params)
            .await
            .map_err(map_share_repository_error)?;
        let items = records.into_iter().map(SharePayload::from).collect();
        Ok(Paginated::assemble(items, request.params, total))
    }

    async fn list_for_doctor(
        &self,
        request: ListDoctorSharesRequest,
    ) -> Result<Paginated<SharePayload>, Error> {
        let (records, total) = self
            .share_repo
            .list_for_doctor(request.doctor_id, request.status, request.params)
            .await
            .map_err(map_share_repository_error)?;
        let items = records.into_iter().map(SharePayload::from).collect();
        Ok(Paginated::assemble(items, request.params, total))
    }
}

#[cfg(test)]
#[path = "share_service_tests.rs"]
mod tests;

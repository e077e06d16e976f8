//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod account;
mod clock;
mod mailer;
mod password_hasher;
mod prediction_command;
mod prediction_query;
mod prediction_repository;
mod share_command;
mod share_query;
mod share_repository;
mod user_repository;

#[cfg(test)]
pub use account::MockAccountService;
pub use account::{
    AccountService, DoctorProfilePayload, FixtureAccountService, LoginRequest, RegisterRequest,
    RegistrationProfile, ResetPasswordRequest, UserPayload, VerifyOtpRequest,
};
#[cfg(test)]
pub use clock::MockClock;
pub use clock::{Clock, FixedClock, SystemClock};
#[cfg(test)]
pub use mailer::MockMailer;
pub use mailer::{FixtureMailer, Mailer, MailerError};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{FixturePasswordHasher, PasswordHasher, PasswordHasherError};
#[cfg(test)]
pub use prediction_command::MockPredictionCommand;
pub use prediction_command::{
    ClinicalInputsPayload, CreatePredictionRequest, CreatePredictionResponse,
    DeletePredictionRequest, DeletePredictionResponse, FixturePredictionCommand, PredictionCommand,
    PredictionPayload, PredictionResultPayload,
};
#[cfg(test)]
pub use prediction_query::MockPredictionQuery;
pub use prediction_query::{
    FixturePredictionQuery, GetPredictionRequest, GetPredictionResponse, ListPredictionsRequest,
    PredictionQuery, PredictionStatsPayload, RiskBreakdownPayload,
};
#[cfg(test)]
pub use prediction_repository::MockPredictionRepository;
pub use prediction_repository::{
    FixturePredictionRepository, PredictionRepository, PredictionRepositoryError, PredictionStats,
};
#[cfg(test)]
pub use share_command::MockShareCommand;
pub use share_command::{
    CreateShareRequest, CreateShareResponse, DoctorResponsePayload, FixtureShareCommand,
    ParticipantPayload, PredictionSummaryPayload, RespondToShareRequest, RespondToShareResponse,
    RevokeShareRequest, RevokeShareResponse, ShareCommand, SharePayload, ViewShareRequest,
    ViewShareResponse,
};
#[cfg(test)]
pub use share_query::MockShareQuery;
pub use share_query::{
    FixtureShareQuery, ListDoctorSharesRequest, ListPatientSharesRequest, ShareQuery,
};
#[cfg(test)]
pub use share_repository::MockShareRepository;
pub use share_repository::{
    FixtureShareRepository, ParticipantSummary, PredictionSummary, ShareRecord, ShareRepository,
    ShareRepositoryError,
};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{FixtureUserRepository, UserRepository, UserRepositoryError};

//! Domain model for the prediction-sharing workflow.
//!
//! Aggregates, value types, and services live here, decoupled from HTTP and
//! storage through the ports in [`ports`].

mod account_service;
mod error;
pub mod notifications;
pub mod otp;
pub mod ports;
pub mod prediction;
mod prediction_service;
pub mod share;
mod share_service;
mod trace_id;
pub mod user;

pub use account_service::{PASSWORD_MIN, UserAccountService};
pub use error::{Error, ErrorCode, ErrorValidationError};
pub use otp::{OtpChallenge, ResetChallenge};
pub use prediction::{
    ClinicalInputs, ClinicalInputsDraft, ClinicalInputsError, Prediction, PredictionDraft,
    PredictionId, PredictionResult, PredictionResultError, RiskLevel, Severity, Sex,
};
pub use prediction_service::PredictionService;
pub use share::{
    DoctorResponse, ShareCode, ShareId, ShareMessage, ShareStatus, ShareValidationError,
    SharedPrediction, SharedPredictionDraft,
};
pub use share_service::ShareService;
pub use trace_id::{TRACE_ID_HEADER, TraceId};
pub use user::{
    DoctorProfile, Email, FullName, PasswordHash, Profile, User, UserDraft, UserId,
    UserValidationError, Username,
};

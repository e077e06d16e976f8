//! Share-and-respond workflow model.
//!
//! A patient shares a prediction with one doctor through an unguessable
//! share code. The share moves through `pending -> viewed -> responded`, or
//! is cut short by `revoked`. Transitions are enforced twice: here as pure
//! checks, and in the store as conditional updates so concurrent writers
//! cannot race past each other.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::prediction::PredictionId;
use crate::domain::user::UserId;

/// Days before an unanswered share lapses.
pub const SHARE_TTL_DAYS: i64 = 30;
/// Maximum length of the optional patient note.
pub const SHARE_MESSAGE_MAX: usize = 500;
/// Maximum length of a doctor's response.
pub const RESPONSE_MAX: usize = 2000;
/// Length of a share code in hex characters (128 bits).
pub const SHARE_CODE_LEN: usize = 32;

/// How long a fresh share stays valid.
#[must_use]
pub fn share_ttl() -> Duration {
    Duration::days(SHARE_TTL_DAYS)
}

/// Validation errors for share value types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareValidationError {
    /// The share code was not 32 lowercase hex characters.
    #[error("share code must be {SHARE_CODE_LEN} hex characters")]
    MalformedCode,
    /// The patient note exceeded the maximum length.
    #[error("message must be at most {max} characters")]
    MessageTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The doctor response was empty after trimming.
    #[error("response must not be empty")]
    EmptyResponse,
    /// The doctor response exceeded the maximum length.
    #[error("response must be at most {max} characters")]
    ResponseTooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// Stable share identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = uuid::Uuid)]
pub struct ShareId(Uuid);

impl ShareId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShareId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unguessable capability token granting access to one share.
///
/// 128 bits rendered as 32 lowercase hex characters. Possession of the code
/// is the only credential a doctor needs to view the shared prediction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareCode(String);

impl ShareCode {
    /// Generate a fresh random code.
    #[must_use]
    pub fn generate(rng: &mut impl Rng) -> Self {
        let mut raw = [0_u8; SHARE_CODE_LEN / 2];
        rng.fill(&mut raw);
        Self(hex::encode(raw))
    }

    /// Validate an incoming code.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ShareValidationError> {
        let raw = raw.as_ref();
        let well_formed = raw.len() == SHARE_CODE_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
        if !well_formed {
            return Err(ShareValidationError::MalformedCode);
        }
        Ok(Self(raw.to_owned()))
    }

    /// The hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ShareCode> for String {
    fn from(value: ShareCode) -> Self {
        value.0
    }
}

impl TryFrom<String> for ShareCode {
    type Error = ShareValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Workflow position of a share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    /// Created, not yet opened by the doctor.
    Pending,
    /// Opened at least once, awaiting a response.
    Viewed,
    /// Answered by the doctor; the patient may still revoke.
    Responded,
    /// Withdrawn by the patient; terminal.
    Revoked,
}

impl ShareStatus {
    /// Stable lowercase label used in storage and payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Viewed => "viewed",
            Self::Responded => "responded",
            Self::Revoked => "revoked",
        }
    }

    /// Whether the share still occupies its patient/doctor/prediction slot.
    ///
    /// Only one active share may exist per (prediction, doctor) pair.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Viewed)
    }

    /// Whether a doctor may open the share in this state.
    #[must_use]
    pub const fn allows_view(&self) -> bool {
        matches!(self, Self::Pending | Self::Viewed | Self::Responded)
    }

    /// Whether a doctor may respond in this state.
    #[must_use]
    pub const fn allows_respond(&self) -> bool {
        self.is_active()
    }

    /// Whether the patient may revoke in this state.
    ///
    /// Revocation is allowed from any state except `Revoked`, so a patient
    /// can withdraw a share even after the doctor has answered.
    #[must_use]
    pub const fn allows_revoke(&self) -> bool {
        !matches!(self, Self::Revoked)
    }
}

impl std::str::FromStr for ShareStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "viewed" => Ok(Self::Viewed),
            "responded" => Ok(Self::Responded),
            "revoked" => Ok(Self::Revoked),
            other => Err(format!("unknown share status: {other}")),
        }
    }
}

impl fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional note the patient attaches when sharing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareMessage(String);

impl ShareMessage {
    /// Validate a patient note.
    pub fn new(raw: impl Into<String>) -> Result<Self, ShareValidationError> {
        let message = raw.into();
        if message.chars().count() > SHARE_MESSAGE_MAX {
            return Err(ShareValidationError::MessageTooLong {
                max: SHARE_MESSAGE_MAX,
            });
        }
        Ok(Self(message))
    }
}

impl AsRef<str> for ShareMessage {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<ShareMessage> for String {
    fn from(value: ShareMessage) -> Self {
        value.0
    }
}

impl TryFrom<String> for ShareMessage {
    type Error = ShareValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A doctor's answer to a shared prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorResponse {
    message: String,
    recommendations: Vec<String>,
    follow_up_required: bool,
    responded_at: DateTime<Utc>,
}

impl DoctorResponse {
    /// Validate and build a response.
    pub fn new(
        message: impl Into<String>,
        recommendations: Vec<String>,
        follow_up_required: bool,
        responded_at: DateTime<Utc>,
    ) -> Result<Self, ShareValidationError> {
        let message = message.into();
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(ShareValidationError::EmptyResponse);
        }
        if trimmed.chars().count() > RESPONSE_MAX {
            return Err(ShareValidationError::ResponseTooLong { max: RESPONSE_MAX });
        }
        Ok(Self {
            message: trimmed.to_owned(),
            recommendations,
            follow_up_required,
            responded_at,
        })
    }

    /// The doctor's message, trimmed.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Suggested follow-up actions for the patient.
    #[must_use]
    pub fn recommendations(&self) -> &[String] {
        self.recommendations.as_slice()
    }

    /// Whether the doctor asked for an in-person follow-up.
    #[must_use]
    pub const fn follow_up_required(&self) -> bool {
        self.follow_up_required
    }

    /// When the response was recorded.
    #[must_use]
    pub const fn responded_at(&self) -> DateTime<Utc> {
        self.responded_at
    }
}

/// Plain-data input for [`SharedPrediction::new`]; used by services and row
/// decoders.
#[derive(Debug, Clone)]
pub struct SharedPredictionDraft {
    /// Stable identifier.
    pub id: ShareId,
    /// The prediction being shared.
    pub prediction_id: PredictionId,
    /// Sharing patient.
    pub patient_id: UserId,
    /// Receiving doctor.
    pub doctor_id: UserId,
    /// Capability token for this share.
    pub share_code: ShareCode,
    /// Optional patient note.
    pub message: Option<ShareMessage>,
    /// Workflow position.
    pub status: ShareStatus,
    /// First time the doctor opened the share.
    pub viewed_at: Option<DateTime<Utc>>,
    /// The doctor's answer, once given.
    pub response: Option<DoctorResponse>,
    /// When the patient withdrew the share, if they did.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Instant after which an unanswered share lapses.
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Share aggregate joining one prediction, one patient, and one doctor.
///
/// ## Invariants
/// - `status == Responded` implies `response` is present.
/// - `status == Viewed` or `Responded` implies `viewed_at` is present.
/// - At most one active share exists per (prediction, doctor) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedPrediction {
    id: ShareId,
    prediction_id: PredictionId,
    patient_id: UserId,
    doctor_id: UserId,
    share_code: ShareCode,
    message: Option<ShareMessage>,
    status: ShareStatus,
    viewed_at: Option<DateTime<Utc>>,
    response: Option<DoctorResponse>,
    revoked_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SharedPrediction {
    /// Assemble a share from already-validated components.
    #[must_use]
    pub fn new(draft: SharedPredictionDraft) -> Self {
        let SharedPredictionDraft {
            id,
            prediction_id,
            patient_id,
            doctor_id,
            share_code,
            message,
            status,
            viewed_at,
            response,
            revoked_at,
            expires_at,
            created_at,
        } = draft;
        Self {
            id,
            prediction_id,
            patient_id,
            doctor_id,
            share_code,
            message,
            status,
            viewed_at,
            response,
            revoked_at,
            expires_at,
            created_at,
        }
    }

    /// Stable identifier.
    #[must_use]
    pub const fn id(&self) -> ShareId {
        self.id
    }

    /// The prediction being shared.
    #[must_use]
    pub const fn prediction_id(&self) -> PredictionId {
        self.prediction_id
    }

    /// Sharing patient.
    #[must_use]
    pub const fn patient_id(&self) -> UserId {
        self.patient_id
    }

    /// Receiving doctor.
    #[must_use]
    pub const fn doctor_id(&self) -> UserId {
        self.doctor_id
    }

    /// Capability token for this share.
    #[must_use]
    pub const fn share_code(&self) -> &ShareCode {
        &self.share_code
    }

    /// Optional patient note.
    #[must_use]
    pub const fn message(&self) -> Option<&ShareMessage> {
        self.message.as_ref()
    }

    /// Workflow position.
    #[must_use]
    pub const fn status(&self) -> ShareStatus {
        self.status
    }

    /// First time the doctor opened the share.
    #[must_use]
    pub const fn viewed_at(&self) -> Option<DateTime<Utc>> {
        self.viewed_at
    }

    /// The doctor's answer, once given.
    #[must_use]
    pub const fn response(&self) -> Option<&DoctorResponse> {
        self.response.as_ref()
    }

    /// When the patient withdrew the share, if they did.
    #[must_use]
    pub const fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    /// Instant after which an unanswered share lapses.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the unanswered share has lapsed at `now`.
    ///
    /// Responded shares never expire; the exchange is complete.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status != ShareStatus::Responded && now > self.expires_at
    }

    /// Whether `doctor` is the share's addressee.
    #[must_use]
    pub fn is_addressed_to(&self, doctor: UserId) -> bool {
        self.doctor_id == doctor
    }

    /// Whether `patient` created the share.
    #[must_use]
    pub fn is_owned_by(&self, patient: UserId) -> bool {
        self.patient_id == patient
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rstest::rstest;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid timestamp")
    }

    fn draft(status: ShareStatus) -> SharedPredictionDraft {
        SharedPredictionDraft {
            id: ShareId::random(),
            prediction_id: PredictionId::random(),
            patient_id: UserId::random(),
            doctor_id: UserId::random(),
            share_code: ShareCode::generate(&mut SmallRng::seed_from_u64(1)),
            message: None,
            status,
            viewed_at: None,
            response: None,
            revoked_at: None,
            expires_at: fixed_now() + share_ttl(),
            created_at: fixed_now(),
        }
    }

    #[rstest]
    fn generated_codes_are_32_lowercase_hex() {
        let mut rng = SmallRng::seed_from_u64(42);
        let code = ShareCode::generate(&mut rng);
        assert_eq!(code.as_str().len(), SHARE_CODE_LEN);
        assert!(
            code.as_str()
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[rstest]
    #[case("short")]
    #[case("ABCDEF00112233445566778899AABBCC")]
    #[case("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz")]
    fn malformed_codes_are_rejected(#[case] raw: &str) {
        assert_eq!(
            ShareCode::parse(raw).expect_err("malformed"),
            ShareValidationError::MalformedCode
        );
    }

    #[rstest]
    fn overlong_messages_are_rejected() {
        let raw = "x".repeat(SHARE_MESSAGE_MAX + 1);
        assert_eq!(
            ShareMessage::new(raw).expect_err("too long"),
            ShareValidationError::MessageTooLong {
                max: SHARE_MESSAGE_MAX
            }
        );
    }

    #[rstest]
    fn empty_responses_are_rejected() {
        assert_eq!(
            DoctorResponse::new("   ", vec![], false, fixed_now()).expect_err("empty"),
            ShareValidationError::EmptyResponse
        );
    }

    #[rstest]
    fn responses_are_trimmed() {
        let response =
            DoctorResponse::new("  rest and hydrate  ", vec!["fluids".into()], true, fixed_now())
                .expect("valid response");
        assert_eq!(response.message(), "rest and hydrate");
        assert_eq!(response.recommendations(), ["fluids"]);
        assert!(response.follow_up_required());
    }

    #[rstest]
    #[case(ShareStatus::Pending, true, true, true)]
    #[case(ShareStatus::Viewed, true, true, true)]
    #[case(ShareStatus::Responded, true, false, true)]
    #[case(ShareStatus::Revoked, false, false, false)]
    fn status_gates_each_transition(
        #[case] status: ShareStatus,
        #[case] view: bool,
        #[case] respond: bool,
        #[case] revoke: bool,
    ) {
        assert_eq!(status.allows_view(), view);
        assert_eq!(status.allows_respond(), respond);
        assert_eq!(status.allows_revoke(), revoke);
    }

    #[rstest]
    fn unanswered_shares_lapse_after_thirty_days() {
        let share = SharedPrediction::new(draft(ShareStatus::Pending));
        assert!(!share.is_expired(fixed_now() + Duration::days(SHARE_TTL_DAYS)));
        assert!(share.is_expired(
            fixed_now() + Duration::days(SHARE_TTL_DAYS) + Duration::seconds(1)
        ));
    }

    #[rstest]
    fn responded_shares_never_expire() {
        let share = SharedPrediction::new(draft(ShareStatus::Responded));
        assert!(!share.is_expired(fixed_now() + Duration::days(400)));
    }

    #[rstest]
    fn status_labels_round_trip() {
        for status in [
            ShareStatus::Pending,
            ShareStatus::Viewed,
            ShareStatus::Responded,
            ShareStatus::Revoked,
        ] {
            let parsed: ShareStatus = status.as_str().parse().expect("round trip");
            assert_eq!(parsed, status);
        }
    }
}

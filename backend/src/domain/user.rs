//! User identity and profile model.
//!
//! Purpose: strongly typed account primitives shared by the account, share,
//! and prediction services. Validation lives in the fallible constructors so
//! adapters can never materialise an invalid user.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::otp::{OtpChallenge, ResetChallenge};

/// Validation errors raised by the user value-type constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// The email did not match the expected shape.
    #[error("email address is not valid")]
    InvalidEmail,
    /// The username was empty after trimming.
    #[error("username must not be empty")]
    EmptyUsername,
    /// The username was shorter than the minimum length.
    #[error("username must be at least {min} characters")]
    UsernameTooShort {
        /// Minimum accepted length.
        min: usize,
    },
    /// The username contained whitespace or disallowed characters.
    #[error("username may only contain letters, numbers, dots, or underscores")]
    UsernameInvalidCharacters,
    /// The full name was empty after trimming.
    #[error("full name must not be empty")]
    EmptyFullName,
    /// The full name exceeded the maximum length.
    #[error("full name must be at most {max} characters")]
    FullNameTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// A doctor profile field was empty.
    #[error("{field} is required for doctors")]
    MissingDoctorField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// Doctor experience exceeded the plausible bound.
    #[error("experience must be at most {max} years")]
    ExperienceOutOfRange {
        /// Maximum accepted years of experience.
        max: u8,
    },
}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = uuid::Uuid)]
pub struct UserId(Uuid);

impl UserId {
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

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        let pattern = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Lowercased, shape-validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and normalise an email address.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = raw.as_ref().trim();
        if !email_regex().is_match(trimmed) {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(trimmed.to_lowercase()))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Minimum allowed length for a username.
pub const USERNAME_MIN: usize = 3;

static USERNAME_RE: OnceLock<Regex> = OnceLock::new();

fn username_regex() -> &'static Regex {
    USERNAME_RE.get_or_init(|| {
        // Length is enforced separately; this regex constrains allowed characters.
        let pattern = "^[a-z0-9._]+$";
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("username regex failed to compile: {error}"))
    })
}

/// Lowercased login handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and normalise a username.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        if normalised.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if normalised.chars().count() < USERNAME_MIN {
            return Err(UserValidationError::UsernameTooShort { min: USERNAME_MIN });
        }
        if !username_regex().is_match(&normalised) {
            return Err(UserValidationError::UsernameInvalidCharacters);
        }
        Ok(Self(normalised))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Maximum allowed length for a full name.
pub const FULL_NAME_MAX: usize = 100;

/// Human-readable display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FullName(String);

impl FullName {
    /// Validate a full name.
    pub fn new(raw: impl Into<String>) -> Result<Self, UserValidationError> {
        let name = raw.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyFullName);
        }
        if trimmed.chars().count() > FULL_NAME_MAX {
            return Err(UserValidationError::FullNameTooLong { max: FULL_NAME_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for FullName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<FullName> for String {
    fn from(value: FullName) -> Self {
        value.0
    }
}

impl TryFrom<String> for FullName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Maximum plausible years of clinical experience.
pub const EXPERIENCE_MAX_YEARS: u8 = 70;

/// Doctor-only attributes carried by the [`Profile::Doctor`] variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorProfile {
    specialization: String,
    license_number: String,
    experience_years: u8,
}

impl DoctorProfile {
    /// Validate and build a doctor profile.
    pub fn new(
        specialization: impl Into<String>,
        license_number: impl Into<String>,
        experience_years: u8,
    ) -> Result<Self, UserValidationError> {
        let specialization = specialization.into();
        if specialization.trim().is_empty() {
            return Err(UserValidationError::MissingDoctorField {
                field: "specialization",
            });
        }
        let license_number = license_number.into();
        if license_number.trim().is_empty() {
            return Err(UserValidationError::MissingDoctorField {
                field: "licenseNumber",
            });
        }
        if experience_years > EXPERIENCE_MAX_YEARS {
            return Err(UserValidationError::ExperienceOutOfRange {
                max: EXPERIENCE_MAX_YEARS,
            });
        }
        Ok(Self {
            specialization,
            license_number,
            experience_years,
        })
    }

    /// Medical specialization, e.g. "cardiology".
    #[must_use]
    pub fn specialization(&self) -> &str {
        self.specialization.as_str()
    }

    /// Registration/license number; unique across doctors.
    #[must_use]
    pub fn license_number(&self) -> &str {
        self.license_number.as_str()
    }

    /// Years of clinical experience.
    #[must_use]
    pub const fn experience_years(&self) -> u8 {
        self.experience_years
    }
}

/// Account profile variant.
///
/// Required-field validation and email rendering dispatch on this variant
/// instead of comparing role strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    /// Regular patient account.
    Patient,
    /// Doctor account with mandatory clinical attributes.
    Doctor(DoctorProfile),
    /// Administrative account; never created through registration.
    Admin,
}

impl Profile {
    /// Stable role label used in session state and API payloads.
    #[must_use]
    pub const fn role_name(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor(_) => "doctor",
            Self::Admin => "admin",
        }
    }

    /// Whether this is a doctor profile.
    #[must_use]
    pub const fn is_doctor(&self) -> bool {
        matches!(self, Self::Doctor(_))
    }

    /// Borrow the doctor attributes when present.
    #[must_use]
    pub const fn doctor(&self) -> Option<&DoctorProfile> {
        match self {
            Self::Doctor(profile) => Some(profile),
            _ => None,
        }
    }
}

/// Opaque password hash (argon2id). Never serialised into API payloads.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap an encoded hash produced by the hasher port.
    #[must_use]
    pub const fn new(encoded: String) -> Self {
        Self(encoded)
    }

    /// The PHC-encoded hash string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Application user aggregate.
///
/// ## Invariants
/// - `username` and `email` are unique across the store.
/// - Doctor accounts always carry a complete [`DoctorProfile`].
/// - Accounts are never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    username: Username,
    email: Email,
    full_name: FullName,
    password_hash: PasswordHash,
    profile: Profile,
    verified: bool,
    otp: Option<OtpChallenge>,
    reset: Option<ResetChallenge>,
    created_at: DateTime<Utc>,
}

/// Plain-data input for [`User::new`]; used by services and row decoders.
#[derive(Debug, Clone)]
pub struct UserDraft {
    /// Stable identifier.
    pub id: UserId,
    /// Unique login handle.
    pub username: Username,
    /// Unique contact address.
    pub email: Email,
    /// Display name.
    pub full_name: FullName,
    /// Argon2id hash of the credential.
    pub password_hash: PasswordHash,
    /// Patient, doctor, or admin variant.
    pub profile: Profile,
    /// Whether the account completed OTP verification.
    pub verified: bool,
    /// Pending verification challenge, if any.
    pub otp: Option<OtpChallenge>,
    /// Pending password-reset challenge, if any.
    pub reset: Option<ResetChallenge>,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Assemble a user from already-validated components.
    #[must_use]
    pub fn new(draft: UserDraft) -> Self {
        let UserDraft {
            id,
            username,
            email,
            full_name,
            password_hash,
            profile,
            verified,
            otp,
            reset,
            created_at,
        } = draft;
        Self {
            id,
            username,
            email,
            full_name,
            password_hash,
            profile,
            verified,
            otp,
            reset,
            created_at,
        }
    }

    /// Stable identifier.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Login handle.
    #[must_use]
    pub const fn username(&self) -> &Username {
        &self.username
    }

    /// Contact address.
    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    /// Display name.
    #[must_use]
    pub const fn full_name(&self) -> &FullName {
        &self.full_name
    }

    /// Stored credential hash.
    #[must_use]
    pub const fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    /// Profile variant.
    #[must_use]
    pub const fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Whether the account completed OTP verification.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.verified
    }

    /// Pending verification challenge.
    #[must_use]
    pub const fn otp(&self) -> Option<&OtpChallenge> {
        self.otp.as_ref()
    }

    /// Pending password-reset challenge.
    #[must_use]
    pub const fn reset(&self) -> Option<&ResetChallenge> {
        self.reset.as_ref()
    }

    /// Registration timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// A doctor eligible to receive shares: doctor profile and verified.
    #[must_use]
    pub const fn is_eligible_doctor(&self) -> bool {
        self.profile.is_doctor() && self.verified
    }

    /// Mark the account verified and clear its challenge.
    pub fn mark_verified(&mut self) {
        self.verified = true;
        self.otp = None;
    }

    /// Replace the pending verification challenge.
    pub fn set_otp(&mut self, otp: Option<OtpChallenge>) {
        self.otp = otp;
    }

    /// Replace the pending password-reset challenge.
    pub fn set_reset(&mut self, reset: Option<ResetChallenge>) {
        self.reset = reset;
    }

    /// Replace the stored credential hash.
    pub fn set_password_hash(&mut self, hash: PasswordHash) {
        self.password_hash = hash;
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Ada@Example.COM", "ada@example.com")]
    #[case("  dr.grey@clinic.org ", "dr.grey@clinic.org")]
    fn emails_are_normalised(#[case] raw: &str, #[case] expected: &str) {
        let email = Email::new(raw).expect("valid email");
        assert_eq!(email.as_ref(), expected);
    }

    #[rstest]
    #[case("no-at-sign")]
    #[case("two words@example.com")]
    #[case("missing@tld")]
    fn malformed_emails_are_rejected(#[case] raw: &str) {
        assert_eq!(
            Email::new(raw).expect_err("invalid email"),
            UserValidationError::InvalidEmail
        );
    }

    #[rstest]
    fn usernames_are_lowercased() {
        let username = Username::new("Ada.Lovelace").expect("valid username");
        assert_eq!(username.as_ref(), "ada.lovelace");
    }

    #[rstest]
    fn short_usernames_are_rejected() {
        assert_eq!(
            Username::new("ab").expect_err("too short"),
            UserValidationError::UsernameTooShort { min: USERNAME_MIN }
        );
    }

    #[rstest]
    fn usernames_with_spaces_are_rejected() {
        assert_eq!(
            Username::new("ada lovelace").expect_err("spaces"),
            UserValidationError::UsernameInvalidCharacters
        );
    }

    #[rstest]
    fn doctor_profile_requires_all_fields() {
        let err = DoctorProfile::new("", "GMC-1234", 5).expect_err("missing specialization");
        assert_eq!(
            err,
            UserValidationError::MissingDoctorField {
                field: "specialization"
            }
        );
    }

    #[rstest]
    fn doctor_profile_bounds_experience() {
        let err =
            DoctorProfile::new("cardiology", "GMC-1234", EXPERIENCE_MAX_YEARS + 1)
                .expect_err("experience out of range");
        assert_eq!(
            err,
            UserValidationError::ExperienceOutOfRange {
                max: EXPERIENCE_MAX_YEARS
            }
        );
    }

    #[rstest]
    fn profile_role_names_are_stable() {
        let doctor = Profile::Doctor(
            DoctorProfile::new("cardiology", "GMC-1234", 5).expect("valid profile"),
        );
        assert_eq!(Profile::Patient.role_name(), "patient");
        assert_eq!(doctor.role_name(), "doctor");
        assert_eq!(Profile::Admin.role_name(), "admin");
    }

    #[rstest]
    fn password_hash_debug_redacts_contents() {
        let hash = PasswordHash::new("$argon2id$v=19$secret".to_owned());
        assert_eq!(format!("{hash:?}"), "PasswordHash(..)");
    }
}

//! Symptom predictions and their clinical inputs.
//!
//! A prediction records the patient-entered clinical picture together with
//! the model's assessment. Inputs are validated field by field, reporting the
//! first violation so the client can highlight a single control.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::user::UserId;

/// Maximum accepted age in years.
pub const AGE_MAX: u16 = 120;
/// Inclusive systolic blood pressure range in mmHg.
pub const SYSTOLIC_BP_RANGE: std::ops::RangeInclusive<u16> = 80..=200;
/// Maximum accepted symptom duration in days.
pub const DURATION_MAX_DAYS: u16 = 365;
/// Maximum number of symptoms accepted per prediction.
pub const SYMPTOMS_MAX: usize = 20;

/// Validation errors for clinical inputs, ordered by the field they name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClinicalInputsError {
    /// No symptoms were supplied.
    #[error("at least one symptom is required")]
    NoSymptoms,
    /// Too many symptoms were supplied.
    #[error("at most {max} symptoms are accepted")]
    TooManySymptoms {
        /// Maximum accepted count.
        max: usize,
    },
    /// A symptom entry was blank.
    #[error("symptom entries must not be blank")]
    BlankSymptom,
    /// The age fell outside the accepted range.
    #[error("age must be between 0 and {max}")]
    AgeOutOfRange {
        /// Maximum accepted age.
        max: u16,
    },
    /// The systolic blood pressure fell outside the accepted range.
    #[error("systolic blood pressure must be between {min} and {max} mmHg")]
    BloodPressureOutOfRange {
        /// Lower bound in mmHg.
        min: u16,
        /// Upper bound in mmHg.
        max: u16,
    },
    /// The symptom duration fell outside the accepted range.
    #[error("duration must be between 0 and {max} days")]
    DurationOutOfRange {
        /// Maximum accepted duration in days.
        max: u16,
    },
}

impl ClinicalInputsError {
    /// The input field the violation refers to, in API casing.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::NoSymptoms | Self::TooManySymptoms { .. } | Self::BlankSymptom => "symptoms",
            Self::AgeOutOfRange { .. } => "age",
            Self::BloodPressureOutOfRange { .. } => "systolicBp",
            Self::DurationOutOfRange { .. } => "durationDays",
        }
    }
}

/// Patient sex as recorded for the prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Other or undisclosed.
    Other,
}

impl Sex {
    /// Stable lowercase label used in storage and payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown sex: {other}")),
        }
    }
}

/// Self-reported symptom severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Mild discomfort.
    Mild,
    /// Noticeable impairment.
    Moderate,
    /// Severe impairment.
    Severe,
}

impl Severity {
    /// Stable lowercase label used in storage and payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mild" => Ok(Self::Mild),
            "moderate" => Ok(Self::Moderate),
            "severe" => Ok(Self::Severe),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Model-assessed risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Self-care is likely sufficient.
    Low,
    /// A routine consultation is advised.
    Medium,
    /// Prompt medical attention is advised.
    High,
}

impl RiskLevel {
    /// Stable lowercase label used in storage and payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

/// Unvalidated clinical inputs as received from the client.
#[derive(Debug, Clone)]
pub struct ClinicalInputsDraft {
    /// Reported symptoms.
    pub symptoms: Vec<String>,
    /// Age in years.
    pub age: u16,
    /// Patient sex.
    pub sex: Sex,
    /// Systolic blood pressure in mmHg.
    pub systolic_bp: u16,
    /// How long symptoms have persisted, in days.
    pub duration_days: u16,
    /// Self-reported severity.
    pub severity: Severity,
}

/// Validated clinical picture attached to a prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicalInputs {
    symptoms: Vec<String>,
    age: u16,
    sex: Sex,
    systolic_bp: u16,
    duration_days: u16,
    severity: Severity,
}

impl ClinicalInputs {
    /// Validate a draft, reporting the first violation in field order.
    pub fn new(draft: ClinicalInputsDraft) -> Result<Self, ClinicalInputsError> {
        let ClinicalInputsDraft {
            symptoms,
            age,
            sex,
            systolic_bp,
            duration_days,
            severity,
        } = draft;

        if symptoms.is_empty() {
            return Err(ClinicalInputsError::NoSymptoms);
        }
        if symptoms.len() > SYMPTOMS_MAX {
            return Err(ClinicalInputsError::TooManySymptoms { max: SYMPTOMS_MAX });
        }
        let symptoms: Vec<String> = symptoms
            .into_iter()
            .map(|s| s.trim().to_owned())
            .collect();
        if symptoms.iter().any(String::is_empty) {
            return Err(ClinicalInputsError::BlankSymptom);
        }
        if age > AGE_MAX {
            return Err(ClinicalInputsError::AgeOutOfRange { max: AGE_MAX });
        }
        if !SYSTOLIC_BP_RANGE.contains(&systolic_bp) {
            return Err(ClinicalInputsError::BloodPressureOutOfRange {
                min: *SYSTOLIC_BP_RANGE.start(),
                max: *SYSTOLIC_BP_RANGE.end(),
            });
        }
        if duration_days > DURATION_MAX_DAYS {
            return Err(ClinicalInputsError::DurationOutOfRange {
                max: DURATION_MAX_DAYS,
            });
        }
        Ok(Self {
            symptoms,
            age,
            sex,
            systolic_bp,
            duration_days,
            severity,
        })
    }

    /// Reported symptoms, trimmed.
    #[must_use]
    pub fn symptoms(&self) -> &[String] {
        self.symptoms.as_slice()
    }

    /// Age in years.
    #[must_use]
    pub const fn age(&self) -> u16 {
        self.age
    }

    /// Patient sex.
    #[must_use]
    pub const fn sex(&self) -> Sex {
        self.sex
    }

    /// Systolic blood pressure in mmHg.
    #[must_use]
    pub const fn systolic_bp(&self) -> u16 {
        self.systolic_bp
    }

    /// Symptom duration in days.
    #[must_use]
    pub const fn duration_days(&self) -> u16 {
        self.duration_days
    }

    /// Self-reported severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }
}

/// Validation errors for the model output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionResultError {
    /// The predicted condition was blank.
    #[error("predicted condition must not be empty")]
    EmptyCondition,
    /// The confidence fell outside `[0, 1]`.
    #[error("confidence must be between 0 and 1")]
    ConfidenceOutOfRange,
}

/// Model assessment attached to a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    condition: String,
    confidence: f64,
    risk_level: RiskLevel,
    recommendations: Vec<String>,
    notes: Option<String>,
}

impl PredictionResult {
    /// Validate and build a model assessment.
    pub fn new(
        condition: impl Into<String>,
        confidence: f64,
        risk_level: RiskLevel,
        recommendations: Vec<String>,
        notes: Option<String>,
    ) -> Result<Self, PredictionResultError> {
        let condition = condition.into();
        if condition.trim().is_empty() {
            return Err(PredictionResultError::EmptyCondition);
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(PredictionResultError::ConfidenceOutOfRange);
        }
        Ok(Self {
            condition,
            confidence,
            risk_level,
            recommendations,
            notes,
        })
    }

    /// Predicted condition name.
    #[must_use]
    pub fn condition(&self) -> &str {
        self.condition.as_str()
    }

    /// Model confidence in `[0, 1]`.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Assessed risk band.
    #[must_use]
    pub const fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Suggested next steps for the patient.
    #[must_use]
    pub fn recommendations(&self) -> &[String] {
        self.recommendations.as_slice()
    }

    /// Free-text notes from the model.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

/// Stable prediction identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = uuid::Uuid)]
pub struct PredictionId(Uuid);

impl PredictionId {
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

impl fmt::Display for PredictionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PredictionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Plain-data input for [`Prediction::new`]; used by services and row decoders.
#[derive(Debug, Clone)]
pub struct PredictionDraft {
    /// Stable identifier.
    pub id: PredictionId,
    /// Owning patient.
    pub patient_id: UserId,
    /// Validated clinical picture.
    pub inputs: ClinicalInputs,
    /// Model assessment.
    pub result: PredictionResult,
    /// Soft-delete marker.
    pub deleted: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Prediction aggregate owned by a patient.
///
/// ## Invariants
/// - Deletion is a soft flag; rows are never removed.
/// - A deleted prediction behaves as absent for every read and share path.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    id: PredictionId,
    patient_id: UserId,
    inputs: ClinicalInputs,
    result: PredictionResult,
    deleted: bool,
    created_at: DateTime<Utc>,
}

impl Prediction {
    /// Assemble a prediction from already-validated components.
    #[must_use]
    pub fn new(draft: PredictionDraft) -> Self {
        let PredictionDraft {
            id,
            patient_id,
            inputs,
            result,
            deleted,
            created_at,
        } = draft;
        Self {
            id,
            patient_id,
            inputs,
            result,
            deleted,
            created_at,
        }
    }

    /// Stable identifier.
    #[must_use]
    pub const fn id(&self) -> PredictionId {
        self.id
    }

    /// Owning patient.
    #[must_use]
    pub const fn patient_id(&self) -> UserId {
        self.patient_id
    }

    /// Validated clinical picture.
    #[must_use]
    pub const fn inputs(&self) -> &ClinicalInputs {
        &self.inputs
    }

    /// Model assessment.
    #[must_use]
    pub const fn result(&self) -> &PredictionResult {
        &self.result
    }

    /// Whether the prediction has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether `user` owns this prediction.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.patient_id == user
    }
}

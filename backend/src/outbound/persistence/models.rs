//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{predictions, shared_predictions, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: String,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub experience_years: Option<i16>,
    pub verified: bool,
    pub otp_hash: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub reset_hash: Option<String>,
    pub reset_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[expect(dead_code, reason = "schema field for future audit trail support")]
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for creating new user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub specialization: Option<&'a str>,
    pub license_number: Option<&'a str>,
    pub experience_years: Option<i16>,
    pub verified: bool,
    pub otp_hash: Option<&'a str>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset struct covering every field the domain can mutate.
///
/// Challenge columns are double-`Option` so a cleared challenge writes NULL
/// rather than being skipped by the changeset.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserUpdate<'a> {
    pub password_hash: &'a str,
    pub verified: bool,
    pub otp_hash: Option<&'a str>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub reset_hash: Option<&'a str>,
    pub reset_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Prediction models
// ---------------------------------------------------------------------------

/// Row struct for reading from the predictions table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = predictions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PredictionRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub symptoms: Vec<String>,
    pub age: i16,
    pub sex: String,
    pub systolic_bp: i16,
    pub duration_days: i16,
    pub severity: String,
    pub condition: String,
    pub confidence: f64,
    pub risk_level: String,
    pub recommendations: Vec<String>,
    pub notes: Option<String>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating new prediction records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = predictions)]
pub(crate) struct NewPredictionRow<'a> {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub symptoms: &'a [String],
    pub age: i16,
    pub sex: &'a str,
    pub systolic_bp: i16,
    pub duration_days: i16,
    pub severity: &'a str,
    pub condition: &'a str,
    pub confidence: f64,
    pub risk_level: &'a str,
    pub recommendations: &'a [String],
    pub notes: Option<&'a str>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Shared prediction models
// ---------------------------------------------------------------------------

/// Row struct for reading from the shared_predictions table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = shared_predictions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SharedPredictionRow {
    pub id: Uuid,
    pub prediction_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub share_code: String,
    pub message: Option<String>,
    pub status: String,
    pub viewed_at: Option<DateTime<Utc>>,
    pub response_message: Option<String>,
    pub response_recommendations: Option<Vec<String>>,
    pub follow_up_required: Option<bool>,
    pub responded_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating new share records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = shared_predictions)]
pub(crate) struct NewSharedPredictionRow<'a> {
    pub id: Uuid,
    pub prediction_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub share_code: &'a str,
    pub message: Option<&'a str>,
    pub status: &'a str,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations exactly; Diesel uses them for
//! compile-time query validation. Regenerate with `diesel print-schema` when
//! a migration changes the shape of a table.

diesel::table! {
    /// Registered accounts for patients, doctors, and administrators.
    ///
    /// Doctor credential columns are null for every other role. Challenge
    /// columns hold only SHA-256 digests, never the emailed secrets.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Unique login handle, lowercase.
        username -> Varchar,
        /// Unique contact address, lowercase.
        email -> Varchar,
        /// Display name.
        full_name -> Varchar,
        /// PHC-encoded Argon2id credential hash.
        password_hash -> Text,
        /// Account role: `patient`, `doctor`, or `admin`.
        role -> Varchar,
        /// Medical specialization, doctors only.
        specialization -> Nullable<Varchar>,
        /// Unique professional license number, doctors only.
        license_number -> Nullable<Varchar>,
        /// Years of practice, doctors only.
        experience_years -> Nullable<Int2>,
        /// Whether the email address has been verified.
        verified -> Bool,
        /// Digest of the pending verification code.
        otp_hash -> Nullable<Varchar>,
        /// Expiry of the pending verification code.
        otp_expires_at -> Nullable<Timestamptz>,
        /// Digest of the pending password-reset token.
        reset_hash -> Nullable<Varchar>,
        /// Expiry of the pending password-reset token.
        reset_expires_at -> Nullable<Timestamptz>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Symptom predictions owned by patients.
    ///
    /// Rows are never removed; `deleted` soft-deletes them out of every
    /// read path.
    predictions (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Owning patient account.
        patient_id -> Uuid,
        /// Reported symptoms, trimmed.
        symptoms -> Array<Text>,
        /// Age in years.
        age -> Int2,
        /// Patient sex: `male`, `female`, or `other`.
        sex -> Varchar,
        /// Systolic blood pressure in mmHg.
        systolic_bp -> Int2,
        /// Symptom duration in days.
        duration_days -> Int2,
        /// Self-reported severity: `mild`, `moderate`, or `severe`.
        severity -> Varchar,
        /// Predicted condition name.
        condition -> Varchar,
        /// Model confidence in `[0, 1]`.
        confidence -> Float8,
        /// Assessed risk band: `low`, `medium`, or `high`.
        risk_level -> Varchar,
        /// Suggested next steps for the patient.
        recommendations -> Array<Text>,
        /// Free-text notes from the model.
        notes -> Nullable<Text>,
        /// Soft-delete marker.
        deleted -> Bool,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Share-and-respond workflow rows.
    ///
    /// A partial unique index keeps at most one active row per
    /// (prediction, doctor) pair; `share_code` is globally unique.
    shared_predictions (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// The prediction being shared.
        prediction_id -> Uuid,
        /// Sharing patient account.
        patient_id -> Uuid,
        /// Receiving doctor account.
        doctor_id -> Uuid,
        /// Unique 32-hex capability token.
        share_code -> Varchar,
        /// Optional patient note.
        message -> Nullable<Text>,
        /// Workflow position: `pending`, `viewed`, `responded`, `revoked`.
        status -> Varchar,
        /// First time the doctor opened the share.
        viewed_at -> Nullable<Timestamptz>,
        /// The doctor's answer, once given.
        response_message -> Nullable<Text>,
        /// Follow-up actions suggested by the doctor.
        response_recommendations -> Nullable<Array<Text>>,
        /// Whether the doctor asked for an in-person follow-up.
        follow_up_required -> Nullable<Bool>,
        /// When the response was recorded.
        responded_at -> Nullable<Timestamptz>,
        /// When the patient withdrew the share.
        revoked_at -> Nullable<Timestamptz>,
        /// Instant after which an unanswered share lapses.
        expires_at -> Timestamptz,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(shared_predictions -> predictions (prediction_id));

diesel::allow_tables_to_appear_in_same_query!(users, predictions, shared_predictions);

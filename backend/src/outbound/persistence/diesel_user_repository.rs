//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! Rows are rebuilt through the validated domain constructors, so a corrupt
//! column surfaces as a query error instead of an invalid aggregate.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::otp::{OtpChallenge, ResetChallenge};
use crate::domain::ports::{UserRepository, UserRepositoryError};
use crate::domain::user::{
    DoctorProfile, Email, FullName, PasswordHash, Profile, User, UserDraft, UserId, Username,
};

use super::diesel_error_mapping::{
    map_diesel_error_with, map_pool_error_with, unique_violation_constraint,
};
use super::models::{NewUserRow, UserRow, UserUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the user repository port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserRepositoryError {
    map_pool_error_with(error, |message| UserRepositoryError::connection(message))
}

/// Map Diesel errors, translating unique violations into the duplicate-key
/// variant the account service reports as a conflict.
fn map_diesel_error(error: diesel::result::Error) -> UserRepositoryError {
    match unique_violation_constraint(&error) {
        Some("users_username_key") => UserRepositoryError::duplicate_key("username"),
        Some("users_email_key") => UserRepositoryError::duplicate_key("email"),
        Some("users_license_number_key") => UserRepositoryError::duplicate_key("license number"),
        _ => map_diesel_error_with(
            error,
            UserRepositoryError::query,
            UserRepositoryError::connection,
        ),
    }
}

fn decode_profile(row: &UserRow) -> Result<Profile, UserRepositoryError> {
    match row.role.as_str() {
        "patient" => Ok(Profile::Patient),
        "admin" => Ok(Profile::Admin),
        "doctor" => {
            let specialization = row
                .specialization
                .as_deref()
                .ok_or_else(|| UserRepositoryError::query("doctor row missing specialization"))?;
            let license_number = row
                .license_number
                .as_deref()
                .ok_or_else(|| UserRepositoryError::query("doctor row missing license number"))?;
            let experience_years = row
                .experience_years
                .and_then(|years| u8::try_from(years).ok())
                .ok_or_else(|| UserRepositoryError::query("doctor row missing experience"))?;
            DoctorProfile::new(specialization, license_number, experience_years)
                .map(Profile::Doctor)
                .map_err(|err| UserRepositoryError::query(err.to_string()))
        }
        other => Err(UserRepositoryError::query(format!("unknown role: {other}"))),
    }
}

/// Convert a database row into a validated domain user.
fn row_to_user(row: UserRow) -> Result<User, UserRepositoryError> {
    let profile = decode_profile(&row)?;
    let as_query_error = |err: crate::domain::user::UserValidationError| {
        UserRepositoryError::query(err.to_string())
    };

    let otp = match (row.otp_hash, row.otp_expires_at) {
        (Some(hash), Some(expires_at)) => Some(OtpChallenge::from_parts(hash, expires_at)),
        _ => None,
    };
    let reset = match (row.reset_hash, row.reset_expires_at) {
        (Some(hash), Some(expires_at)) => Some(ResetChallenge::from_parts(hash, expires_at)),
        _ => None,
    };

    Ok(User::new(UserDraft {
        id: UserId::from_uuid(row.id),
        username: Username::new(&row.username).map_err(as_query_error)?,
        email: Email::new(&row.email).map_err(as_query_error)?,
        full_name: FullName::new(row.full_name).map_err(as_query_error)?,
        password_hash: PasswordHash::new(row.password_hash),
        profile,
        verified: row.verified,
        otp,
        reset,
        created_at: row.created_at,
    }))
}

fn user_to_new_row(user: &User) -> NewUserRow<'_> {
    let doctor = user.profile().doctor();
    NewUserRow {
        id: *user.id().as_uuid(),
        username: user.username().as_ref(),
        email: user.email().as_ref(),
        full_name: user.full_name().as_ref(),
        password_hash: user.password_hash().as_str(),
        role: user.profile().role_name(),
        specialization: doctor.map(DoctorProfile::specialization),
        license_number: doctor.map(DoctorProfile::license_number),
        experience_years: doctor.map(|d| i16::from(d.experience_years())),
        verified: user.is_verified(),
        otp_hash: user.otp().map(OtpChallenge::code_hash),
        otp_expires_at: user.otp().map(OtpChallenge::expires_at),
        created_at: user.created_at(),
        updated_at: user.created_at(),
    }
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(users::table)
            .values(&user_to_new_row(user))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let changes = UserUpdate {
            password_hash: user.password_hash().as_str(),
            verified: user.is_verified(),
            otp_hash: user.otp().map(OtpChallenge::code_hash),
            otp_expires_at: user.otp().map(OtpChallenge::expires_at),
            reset_hash: user.reset().map(ResetChallenge::token_hash),
            reset_expires_at: user.reset().map(ResetChallenge::expires_at),
            updated_at: Utc::now(),
        };

        diesel::update(users::table.filter(users::id.eq(user.id().as_uuid())))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = users::table
            .filter(users::email.eq(email.as_ref()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_user).transpose()
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = users::table
            .filter(users::username.eq(username.as_ref()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_user).transpose()
    }

    async fn find_by_reset_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = users::table
            .filter(
                users::reset_hash
                    .eq(token_hash)
                    .and(users::reset_expires_at.gt(Utc::now())),
            )
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_user).transpose()
    }

    async fn license_number_exists(
        &self,
        license_number: &str,
    ) -> Result<bool, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let count: i64 = users::table
            .filter(users::license_number.eq(license_number))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for error mapping and row conversion edge cases.

    use chrono::Utc;
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    use super::*;

    #[fixture]
    fn patient_row() -> UserRow {
        let now = Utc::now();
        UserRow {
            id: Uuid::new_v4(),
            username: "ada".to_owned(),
            email: "ada@example.com".to_owned(),
            full_name: "Ada Lovelace".to_owned(),
            password_hash: "$argon2id$stub".to_owned(),
            role: "patient".to_owned(),
            specialization: None,
            license_number: None,
            experience_years: None,
            verified: true,
            otp_hash: None,
            otp_expires_at: None,
            reset_hash: None,
            reset_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let repo_err = map_pool_error(PoolError::checkout("connection refused"));

        assert!(matches!(repo_err, UserRepositoryError::Connection { .. }));
        assert!(repo_err.to_string().contains("connection refused"));
    }

    #[rstest]
    fn diesel_not_found_maps_to_query_error() {
        let repo_err = map_diesel_error(diesel::result::Error::NotFound);

        assert!(matches!(repo_err, UserRepositoryError::Query { .. }));
        assert!(repo_err.to_string().contains("record not found"));
    }

    #[rstest]
    fn patient_row_converts_without_doctor_columns(patient_row: UserRow) {
        let user = row_to_user(patient_row).expect("valid row converts");
        assert!(matches!(user.profile(), Profile::Patient));
        assert!(user.is_verified());
    }

    #[rstest]
    fn doctor_row_requires_credential_columns(mut patient_row: UserRow) {
        patient_row.role = "doctor".to_owned();

        let error = row_to_user(patient_row).expect_err("missing credentials should fail");
        assert!(matches!(error, UserRepositoryError::Query { .. }));
        assert!(error.to_string().contains("specialization"));
    }

    #[rstest]
    fn doctor_row_converts_with_credentials(mut patient_row: UserRow) {
        patient_row.role = "doctor".to_owned();
        patient_row.specialization = Some("cardiology".to_owned());
        patient_row.license_number = Some("GMC-12345".to_owned());
        patient_row.experience_years = Some(12);

        let user = row_to_user(patient_row).expect("valid doctor row converts");
        let doctor = user.profile().doctor().expect("doctor profile present");
        assert_eq!(doctor.specialization(), "cardiology");
        assert_eq!(doctor.experience_years(), 12);
    }

    #[rstest]
    fn unknown_role_is_rejected(mut patient_row: UserRow) {
        patient_row.role = "superuser".to_owned();

        let error = row_to_user(patient_row).expect_err("unknown role should fail");
        assert!(error.to_string().contains("unknown role"));
    }

    #[rstest]
    fn challenge_columns_round_trip(mut patient_row: UserRow) {
        let expires_at = Utc::now();
        patient_row.otp_hash = Some("ab".repeat(32));
        patient_row.otp_expires_at = Some(expires_at);

        let user = row_to_user(patient_row).expect("valid row converts");
        let otp = user.otp().expect("challenge present");
        assert_eq!(otp.code_hash(), "ab".repeat(32));
        assert_eq!(otp.expires_at(), expires_at);
    }
}

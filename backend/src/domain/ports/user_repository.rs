//! Port for user account persistence.

use async_trait::async_trait;

use crate::domain::user::{Email, User, UserId, Username};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "user repository query failed: {message}",
        /// A unique constraint was violated.
        DuplicateKey { field: String } =>
            "user repository duplicate key on {field}",
    }
}

/// Port for reading and writing user accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new account.
    async fn insert(&self, user: &User) -> Result<(), UserRepositoryError>;

    /// Persist every mutable field of an existing account.
    async fn update(&self, user: &User) -> Result<(), UserRepositoryError>;

    /// Find an account by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError>;

    /// Find an account by email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserRepositoryError>;

    /// Find an account by username.
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserRepositoryError>;

    /// Find the account holding an unexpired reset challenge with this digest.
    async fn find_by_reset_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, UserRepositoryError>;

    /// Whether a doctor already registered this license number.
    async fn license_number_exists(
        &self,
        license_number: &str,
    ) -> Result<bool, UserRepositoryError>;
}

/// Fixture implementation for tests that do not exercise user persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureUserRepository;

#[async_trait]
impl UserRepository for FixtureUserRepository {
    async fn insert(&self, _user: &User) -> Result<(), UserRepositoryError> {
        Ok(())
    }

    async fn update(&self, _user: &User) -> Result<(), UserRepositoryError> {
        Ok(())
    }

    async fn find_by_id(&self, _id: UserId) -> Result<Option<User>, UserRepositoryError> {
        Ok(None)
    }

    async fn find_by_email(&self, _email: &Email) -> Result<Option<User>, UserRepositoryError> {
        Ok(None)
    }

    async fn find_by_username(
        &self,
        _username: &Username,
    ) -> Result<Option<User>, UserRepositoryError> {
        Ok(None)
    }

    async fn find_by_reset_hash(
        &self,
        _token_hash: &str,
    ) -> Result<Option<User>, UserRepositoryError> {
        Ok(None)
    }

    async fn license_number_exists(
        &self,
        _license_number: &str,
    ) -> Result<bool, UserRepositoryError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn fixture_lookups_return_none() {
        let repo = FixtureUserRepository;
        let by_id = repo.find_by_id(UserId::random()).await.expect("lookup succeeds");
        assert!(by_id.is_none());
        let by_hash = repo.find_by_reset_hash("00").await.expect("lookup succeeds");
        assert!(by_hash.is_none());
    }

    #[rstest]
    fn duplicate_key_error_names_the_field() {
        let err = UserRepositoryError::duplicate_key("email");
        assert!(err.to_string().contains("email"));
    }
}

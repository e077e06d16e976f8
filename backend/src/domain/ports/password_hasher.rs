//! Port for password hashing and verification.

use async_trait::async_trait;

use crate::domain::user::PasswordHash;

use super::define_port_error;

define_port_error! {
    /// Errors raised by password hasher adapters.
    pub enum PasswordHasherError {
        /// Hashing failed.
        Hash { message: String } =>
            "password hashing failed: {message}",
        /// The stored hash could not be parsed.
        MalformedHash { message: String } =>
            "stored password hash is malformed: {message}",
    }
}

/// Port for deriving and checking credential hashes.
///
/// Hashing is CPU-bound; adapters are expected to move the work off the
/// async executor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Derive a hash for a new credential.
    async fn hash(&self, password: &str) -> Result<PasswordHash, PasswordHasherError>;

    /// Check a candidate credential against a stored hash.
    async fn verify(
        &self,
        password: &str,
        hash: &PasswordHash,
    ) -> Result<bool, PasswordHasherError>;
}

/// Fixture implementation that stores credentials with a marker prefix.
///
/// Only for tests; performs no key derivation.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePasswordHasher;

const FIXTURE_PREFIX: &str = "fixture$";

#[async_trait]
impl PasswordHasher for FixturePasswordHasher {
    async fn hash(&self, password: &str) -> Result<PasswordHash, PasswordHasherError> {
        Ok(PasswordHash::new(format!("{FIXTURE_PREFIX}{password}")))
    }

    async fn verify(
        &self,
        password: &str,
        hash: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        Ok(hash.as_str() == format!("{FIXTURE_PREFIX}{password}"))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use super::*;

    #[tokio::test]
    async fn fixture_round_trips_credentials() {
        let hasher = FixturePasswordHasher;
        let hash = hasher.hash("hunter22").await.expect("hash succeeds");
        assert!(hasher.verify("hunter22", &hash).await.expect("verify succeeds"));
        assert!(!hasher.verify("wrong", &hash).await.expect("verify succeeds"));
    }
}

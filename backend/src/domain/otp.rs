//! Verification and password-reset challenges.
//!
//! Secrets are delivered to the user over email and only their SHA-256 hex
//! digests are persisted, so a database leak never exposes a live code.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of digits in a verification code.
pub const OTP_DIGITS: u32 = 6;

/// How long a verification code stays valid.
#[must_use]
pub fn otp_ttl() -> Duration {
    Duration::minutes(10)
}

/// How long a password-reset token stays valid.
#[must_use]
pub fn reset_ttl() -> Duration {
    Duration::minutes(15)
}

fn sha256_hex(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// A pending account-verification challenge.
///
/// Holds only the digest of the emailed code plus its expiry instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    code_hash: String,
    expires_at: DateTime<Utc>,
}

impl OtpChallenge {
    /// Issue a fresh challenge, returning the plaintext code for delivery.
    #[must_use]
    pub fn issue(rng: &mut impl Rng, now: DateTime<Utc>) -> (String, Self) {
        let bound = 10_u32.pow(OTP_DIGITS);
        let code = format!("{:06}", rng.gen_range(0..bound));
        let challenge = Self {
            code_hash: sha256_hex(&code),
            expires_at: now + otp_ttl(),
        };
        (code, challenge)
    }

    /// Rebuild a challenge from persisted fields.
    #[must_use]
    pub const fn from_parts(code_hash: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            code_hash,
            expires_at,
        }
    }

    /// Digest of the emailed code.
    #[must_use]
    pub fn code_hash(&self) -> &str {
        self.code_hash.as_str()
    }

    /// Instant after which the code is no longer accepted.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the challenge has lapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether `candidate` hashes to the stored digest.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        sha256_hex(candidate) == self.code_hash
    }
}

/// A pending password-reset challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetChallenge {
    token_hash: String,
    expires_at: DateTime<Utc>,
}

impl ResetChallenge {
    /// Issue a fresh challenge, returning the plaintext token for delivery.
    #[must_use]
    pub fn issue(rng: &mut impl Rng, now: DateTime<Utc>) -> (String, Self) {
        let mut raw = [0_u8; 32];
        rng.fill(&mut raw);
        let token = hex::encode(raw);
        let challenge = Self {
            token_hash: sha256_hex(&token),
            expires_at: now + reset_ttl(),
        };
        (token, challenge)
    }

    /// Rebuild a challenge from persisted fields.
    #[must_use]
    pub const fn from_parts(token_hash: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            token_hash,
            expires_at,
        }
    }

    /// Digest of the emailed token.
    #[must_use]
    pub fn token_hash(&self) -> &str {
        self.token_hash.as_str()
    }

    /// Instant after which the token is no longer accepted.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the challenge has lapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether `candidate` hashes to the stored digest.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        sha256_hex(candidate) == self.token_hash
    }

    /// Digest a raw token so a repository can look it up by hash.
    #[must_use]
    pub fn digest(candidate: &str) -> String {
        sha256_hex(candidate)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid timestamp")
    }

    #[test]
    fn issued_codes_are_six_digits_and_match_their_hash() {
        let mut rng = SmallRng::seed_from_u64(7);
        let (code, challenge) = OtpChallenge::issue(&mut rng, fixed_now());
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert!(challenge.matches(&code));
        assert!(!challenge.matches("000001"));
    }

    #[test]
    fn otp_expires_after_ten_minutes() {
        let mut rng = SmallRng::seed_from_u64(7);
        let now = fixed_now();
        let (_, challenge) = OtpChallenge::issue(&mut rng, now);
        assert!(!challenge.is_expired(now + Duration::minutes(10)));
        assert!(challenge.is_expired(now + Duration::minutes(10) + Duration::seconds(1)));
    }

    #[test]
    fn reset_tokens_are_sixty_four_hex_characters() {
        let mut rng = SmallRng::seed_from_u64(7);
        let (token, challenge) = ResetChallenge::issue(&mut rng, fixed_now());
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(challenge.matches(&token));
        assert_eq!(ResetChallenge::digest(&token), challenge.token_hash());
    }

    #[test]
    fn reset_expires_after_fifteen_minutes() {
        let mut rng = SmallRng::seed_from_u64(7);
        let now = fixed_now();
        let (_, challenge) = ResetChallenge::issue(&mut rng, now);
        assert!(!challenge.is_expired(now + Duration::minutes(15)));
        assert!(challenge.is_expired(now + Duration::minutes(16)));
    }

    #[test]
    fn distinct_issues_produce_distinct_secrets() {
        let mut rng = SmallRng::seed_from_u64(7);
        let (first, _) = ResetChallenge::issue(&mut rng, fixed_now());
        let (second, _) = ResetChallenge::issue(&mut rng, fixed_now());
        assert_ne!(first, second);
    }
}

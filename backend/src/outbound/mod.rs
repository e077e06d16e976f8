//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! Following the hexagonal architecture pattern, each submodule provides
//! concrete implementations of domain port traits:
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **mailer**: SMTP delivery via `lettre`, with a log-only fallback
//! - **security**: Argon2id credential hashing
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod mailer;
pub mod persistence;
pub mod security;

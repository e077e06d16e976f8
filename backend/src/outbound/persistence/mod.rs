//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the repository ports, backed by PostgreSQL
//! via `diesel-async` with `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain aggregates. No business logic resides here.
//! - **Internal models**: row structs (`models.rs`) and schema definitions
//!   (`schema.rs`) are implementation details, never exposed to the domain.
//! - **Validated decoding**: rows are rebuilt through the domain
//!   constructors, so corrupt columns surface as query errors.
//! - **Conditional transitions**: workflow updates filter on the expected
//!   current status and report whether a row matched.

mod diesel_error_mapping;
mod diesel_prediction_repository;
mod diesel_share_repository;
mod diesel_user_repository;
mod models;
mod pool;
mod schema;

pub use diesel_prediction_repository::DieselPredictionRepository;
pub use diesel_share_repository::DieselShareRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use pool::{DbPool, PoolConfig, PoolError};

//! MediShare backend library.
//!
//! Hexagonal layout: `domain` holds the aggregates, services, and ports;
//! `inbound` adapts HTTP requests onto the driving ports; `outbound` adapts
//! the driven ports onto PostgreSQL, SMTP, and Argon2; `server` wires the
//! layers together.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
/// Request tracing middleware attaching a `Trace-Id` to every response.
pub use middleware::Trace;

//! OpenAPI documentation configuration.
//!
//! Defines the [`ApiDoc`] struct generating the OpenAPI specification for
//! the REST API. It registers:
//!
//! - **Paths**: every HTTP endpoint from the inbound layer
//! - **Schemas**: the error wrappers plus the payload types the handlers
//!   exchange; nested schemas are collected from the paths
//! - **Security**: the session cookie authentication scheme
//!
//! The generated specification backs Swagger UI in debug builds and is
//! exported via `cargo run --bin openapi-dump` for external tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema, PageMetaBody};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/auth/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "MediShare backend API",
        description = "HTTP interface for symptom predictions and the \
                       share-and-respond workflow between patients and doctors."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::register,
        crate::inbound::http::auth::verify_otp,
        crate::inbound::http::auth::resend_otp,
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::me,
        crate::inbound::http::auth::forgot_password,
        crate::inbound::http::auth::reset_password,
        crate::inbound::http::predictions::create_prediction,
        crate::inbound::http::predictions::list_predictions,
        crate::inbound::http::predictions::prediction_stats,
        crate::inbound::http::predictions::get_prediction,
        crate::inbound::http::predictions::delete_prediction,
        crate::inbound::http::shares::create_share,
        crate::inbound::http::shares::list_my_shares,
        crate::inbound::http::shares::list_received_shares,
        crate::inbound::http::shares::view_share,
        crate::inbound::http::shares::respond_to_share,
        crate::inbound::http::shares::revoke_share,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema, PageMetaBody)),
    tags(
        (name = "auth", description = "Registration, verification, and sessions"),
        (name = "predictions", description = "Patient symptom predictions"),
        (name = "shares", description = "Share-and-respond workflow"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

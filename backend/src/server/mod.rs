//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::inbound::http::auth::{
    forgot_password, login, logout, me, register, resend_otp, reset_password, verify_otp,
};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::predictions::{
    create_prediction, delete_prediction, get_prediction, list_predictions, prediction_stats,
};
use crate::inbound::http::shares::{
    create_share, list_my_shares, list_received_shares, respond_to_share, revoke_share, view_share,
};
use crate::inbound::http::state::HttpState;
use crate::middleware::Trace;
use state_builders::{build_http_state, build_mailer};

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api/v1")
        .wrap(session)
        .service(register)
        .service(verify_otp)
        .service(resend_otp)
        .service(login)
        .service(logout)
        .service(me)
        .service(forgot_password)
        .service(reset_password)
        .service(create_prediction)
        .service(list_predictions)
        .service(prediction_stats)
        .service(get_prediction)
        .service(delete_prediction)
        .service(create_share)
        .service(list_my_shares)
        .service(list_received_shares)
        .service(view_share)
        .service(respond_to_share)
        .service(revoke_share);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server using the provided health state and
/// configuration.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when the mail transport cannot be built or
/// binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let mailer = build_mailer(&config)
        .map_err(|err| std::io::Error::other(format!("mail transport: {err}")))?;
    let http_state = web::Data::new(build_http_state(&config, mailer));
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        frontend_url: _,
        db_pool: _,
        smtp: _,
    } = config;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

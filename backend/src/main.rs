//! Backend entry-point: loads configuration from the environment, runs
//! migrations, and starts the HTTP server.

use std::env;

use actix_web::cookie::{Key, SameSite};
use actix_web::web;
use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use medishare::inbound::http::health::HealthState;
use medishare::outbound::mailer::SmtpConfig;
use medishare::outbound::persistence::{DbPool, PoolConfig};
use medishare::server::{ServerConfig, create_server};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Load the session signing key, generating an ephemeral one in dev builds.
fn load_session_key() -> std::io::Result<Key> {
    let key_path =
        env::var("SESSION_KEY_FILE").unwrap_or_else(|_| "/var/run/secrets/session_key".into());
    match std::fs::read(&key_path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(e) => {
            let allow_dev = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!(path = %key_path, error = %e, "using temporary session key (dev only)");
                Ok(Key::generate())
            } else {
                Err(std::io::Error::other(format!(
                    "failed to read session key at {key_path}: {e}"
                )))
            }
        }
    }
}

/// Assemble relay settings from the environment, when a host is set.
fn smtp_from_env() -> Option<SmtpConfig> {
    let host = env::var("SMTP_HOST").ok()?;
    let port = env::var("SMTP_PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(587);
    let credentials = match (env::var("SMTP_USERNAME"), env::var("SMTP_PASSWORD")) {
        (Ok(username), Ok(password)) => Some((username, password)),
        _ => None,
    };
    let starttls = env::var("SMTP_STARTTLS").map(|v| v != "0").unwrap_or(true);
    let from = env::var("SMTP_FROM").unwrap_or_else(|_| "MediShare <noreply@medishare.app>".into());
    Some(SmtpConfig {
        host,
        port,
        credentials,
        starttls,
        from,
    })
}

/// Bring the schema up to date before the pool starts serving queries.
fn run_migrations(database_url: &str) -> std::io::Result<()> {
    let mut conn = PgConnection::establish(database_url)
        .map_err(|e| std::io::Error::other(format!("database connection failed: {e}")))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| std::io::Error::other(format!("migrations failed: {e}")))?;
    Ok(())
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let key = load_session_key()?;
    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .map(|v| v != "0")
        .unwrap_or(true);
    let bind_addr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()
        .map_err(|e| std::io::Error::other(format!("invalid BIND_ADDR: {e}")))?;
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".into());

    let mut config = ServerConfig::new(key, cookie_secure, SameSite::Lax, bind_addr, frontend_url)
        .with_smtp(smtp_from_env());

    match env::var("DATABASE_URL") {
        Ok(database_url) => {
            run_migrations(&database_url)?;
            let pool = DbPool::new(PoolConfig::new(&database_url))
                .await
                .map_err(|e| std::io::Error::other(format!("pool construction failed: {e}")))?;
            config = config.with_db_pool(pool);
        }
        Err(_) => warn!("DATABASE_URL not set; starting with fixture ports"),
    }

    let health_state = web::Data::new(HealthState::new());
    create_server(health_state, config)?.await
}

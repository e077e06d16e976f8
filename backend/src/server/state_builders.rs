//! Wiring of domain services onto their outbound adapters.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::notifications::EmailMessage;
use crate::domain::ports::{
    FixtureAccountService, FixturePredictionCommand, FixturePredictionQuery, FixtureShareCommand,
    FixtureShareQuery, Mailer, MailerError, SystemClock,
};
use crate::domain::{PredictionService, ShareService, UserAccountService};
use crate::inbound::http::state::HttpState;
use crate::outbound::mailer::{LogOnlyMailer, SmtpMailer};
use crate::outbound::persistence::{
    DieselPredictionRepository, DieselShareRepository, DieselUserRepository,
};
use crate::outbound::security::Argon2PasswordHasher;

use super::ServerConfig;

/// Mailer selected at startup from the relay configuration.
#[derive(Clone)]
pub(crate) enum AppMailer {
    Smtp(SmtpMailer),
    LogOnly(LogOnlyMailer),
}

#[async_trait]
impl Mailer for AppMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        match self {
            Self::Smtp(mailer) => mailer.send(message).await,
            Self::LogOnly(mailer) => mailer.send(message).await,
        }
    }
}

/// Build the process-wide mailer from the relay settings.
pub(crate) fn build_mailer(config: &ServerConfig) -> Result<AppMailer, MailerError> {
    match &config.smtp {
        Some(smtp) => Ok(AppMailer::Smtp(SmtpMailer::new(smtp)?)),
        None => {
            warn!("no SMTP relay configured; email deliveries will be logged and dropped");
            Ok(AppMailer::LogOnly(LogOnlyMailer))
        }
    }
}

/// Build the HTTP handler state over the configured adapters.
///
/// Falls back to fixture ports when no database pool is configured, so the
/// server can still boot for smoke tests.
pub(crate) fn build_http_state(config: &ServerConfig, mailer: AppMailer) -> HttpState {
    let Some(pool) = &config.db_pool else {
        warn!("no database pool configured; serving fixture ports");
        return HttpState {
            accounts: Arc::new(FixtureAccountService),
            predictions: Arc::new(FixturePredictionCommand),
            predictions_query: Arc::new(FixturePredictionQuery),
            shares: Arc::new(FixtureShareCommand),
            shares_query: Arc::new(FixtureShareQuery),
        };
    };

    let user_repo = Arc::new(DieselUserRepository::new(pool.clone()));
    let prediction_repo = Arc::new(DieselPredictionRepository::new(pool.clone()));
    let share_repo = Arc::new(DieselShareRepository::new(pool.clone()));
    let hasher = Arc::new(Argon2PasswordHasher);
    let mailer = Arc::new(mailer);
    let clock = Arc::new(SystemClock);

    let accounts = Arc::new(UserAccountService::new(
        Arc::clone(&user_repo),
        hasher,
        Arc::clone(&mailer),
        Arc::clone(&clock),
        config.frontend_url.clone(),
    ));
    let predictions = Arc::new(PredictionService::new(
        Arc::clone(&prediction_repo),
        Arc::clone(&share_repo),
        Arc::clone(&clock),
    ));
    let shares = Arc::new(ShareService::new(
        share_repo,
        prediction_repo,
        user_repo,
        mailer,
        clock,
        config.frontend_url.clone(),
    ));

    HttpState {
        accounts,
        predictions: Arc::clone(&predictions) as _,
        predictions_query: predictions,
        shares: Arc::clone(&shares) as _,
        shares_query: shares,
    }
}

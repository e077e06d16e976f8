//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    AccountService, PredictionCommand, PredictionQuery, ShareCommand, ShareQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Registration, authentication, and credential recovery.
    pub accounts: Arc<dyn AccountService>,
    /// Prediction creation and deletion.
    pub predictions: Arc<dyn PredictionCommand>,
    /// Prediction listing, lookup, and statistics.
    pub predictions_query: Arc<dyn PredictionQuery>,
    /// Share workflow transitions.
    pub shares: Arc<dyn ShareCommand>,
    /// Share listings for both sides of the workflow.
    pub shares_query: Arc<dyn ShareQuery>,
}

#[cfg(test)]
impl Default for HttpState {
    fn default() -> Self {
        use crate::domain::ports::{
            FixtureAccountService, FixturePredictionCommand, FixturePredictionQuery,
            FixtureShareCommand, FixtureShareQuery,
        };

        Self {
            accounts: Arc::new(FixtureAccountService),
            predictions: Arc::new(FixturePredictionCommand),
            predictions_query: Arc::new(FixturePredictionQuery),
            shares: Arc::new(FixtureShareCommand),
            shares_query: Arc::new(FixtureShareQuery),
        }
    }
}

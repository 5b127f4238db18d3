//! Application state.

use std::sync::Arc;
use std::time::Duration;

use goalhub_store::Store;

use crate::auth::IdentityVerifier;
use crate::config::ServiceConfig;
use crate::linkage::BookingLinker;
use crate::mpesa::MpesaClient;
use crate::rate_limit::RateLimiter;
use crate::reconcile::ReconciliationEngine;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// M-Pesa gateway client, owner of the access token cache.
    pub mpesa: Arc<MpesaClient>,

    /// Payment lifecycle.
    pub engine: ReconciliationEngine,

    /// Booking creation against payments.
    pub linker: BookingLinker,

    /// Payment initiation limiter.
    pub rate_limiter: Arc<RateLimiter>,

    /// Bearer token verification.
    pub identity: Arc<IdentityVerifier>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound HTTP client cannot be built.
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> reqwest::Result<Self> {
        let mpesa = Arc::new(MpesaClient::new(
            config.mpesa.clone(),
            config.environment,
            config.callback_url(),
        )?);

        if !config.mpesa.has_credentials() {
            tracing::warn!("M-Pesa credentials not configured - pushes will be simulated");
        }

        let identity = Arc::new(IdentityVerifier::new(
            config.auth.clone(),
            config.environment,
        )?);

        if identity.accepts_mock_tokens() {
            tracing::warn!("Identity provider not configured - accepting mock tokens");
        }

        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_seconds),
        ));

        Ok(Self {
            engine: ReconciliationEngine::new(store.clone(), mpesa.clone()),
            linker: BookingLinker::new(store.clone(), config.payment_reuse),
            store,
            config,
            mpesa,
            rate_limiter,
            identity,
        })
    }
}

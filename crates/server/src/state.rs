//! Application state shared across handlers.

use crate::audit::BestEffortAudit;
use crate::engine::SessionEngine;
use crate::ratelimit::RateLimitState;
use hangar_core::CooldownPolicy;
use hangar_core::config::AppConfig;
use hangar_metadata::MetadataStore;
use hangar_metadata::repos::AuditRepo;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Download session lifecycle engine.
    pub engine: SessionEngine,
    /// Per-IP throttling state.
    pub rate_limit: RateLimitState,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Panics
    ///
    /// Panics if the rate limit configuration is invalid; warnings for
    /// risky settings are logged.
    pub fn new(config: AppConfig, metadata: Arc<dyn MetadataStore>) -> Self {
        match config.rate_limit.validate() {
            Ok(warnings) => {
                for warning in warnings {
                    tracing::warn!("Configuration warning: {}", warning);
                }
            }
            Err(error) => {
                panic!("Invalid rate limit configuration: {}", error);
            }
        }

        let rate_limit = RateLimitState::new(&config.rate_limit);
        let audit_sink: Arc<dyn AuditRepo> = metadata.clone();
        let audit = BestEffortAudit::new(audit_sink);
        let policy = CooldownPolicy::new(config.downloads.cooldown());
        let engine = SessionEngine::new(metadata.clone(), policy, audit);

        Self {
            config: Arc::new(config),
            metadata,
            engine,
            rate_limit,
        }
    }

    /// Get the cleanup interval for the rate limiter, if enabled.
    /// A zero interval falls back to 60 seconds so the ticker cannot
    /// panic.
    pub fn rate_limit_cleanup_interval(&self) -> Option<Duration> {
        if self.rate_limit.is_enabled() {
            let interval_secs = self.config.rate_limit.cleanup_interval_secs;
            if interval_secs == 0 {
                tracing::warn!("rate_limit.cleanup_interval_secs is 0, using default of 60 seconds");
                Some(Duration::from_secs(60))
            } else {
                Some(Duration::from_secs(interval_secs))
            }
        } else {
            None
        }
    }
}

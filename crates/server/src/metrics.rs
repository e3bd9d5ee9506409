//! Prometheus metrics for the Hangar server.
//!
//! Metrics carry no per-user data, only aggregate session outcomes.
//! When the `/metrics` endpoint is enabled it must be network-restricted
//! to authorized scraper IPs at the infrastructure level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static SESSIONS_STARTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hangar_sessions_started_total",
        "Total number of download sessions opened",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hangar_sessions_completed_total",
        "Total number of download sessions verified and credited",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hangar_sessions_failed_total",
        "Total number of download sessions rejected at completion",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_ABANDONED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hangar_sessions_abandoned_total",
        "Total number of download sessions cancelled or failed by the client",
    )
    .expect("metric creation failed")
});

pub static COOLDOWN_REJECTIONS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "hangar_cooldown_rejections_total",
        "Total number of session opens rejected by the cooldown",
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Idempotent.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let metrics: [&IntCounter; 5] = [
            &SESSIONS_STARTED,
            &SESSIONS_COMPLETED,
            &SESSIONS_FAILED,
            &SESSIONS_ABANDONED,
            &COOLDOWN_REJECTIONS,
        ];
        for metric in metrics {
            REGISTRY
                .register(Box::new(metric.clone()))
                .expect("metric registration failed");
        }
    });
}

/// GET /metrics - Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buf) {
        tracing::error!(error = %e, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new()).into_response();
    }
    (
        StatusCode::OK,
        [("Content-Type", encoder.format_type().to_string())],
        buf,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        register_metrics();
        register_metrics();
        SESSIONS_STARTED.inc();
        assert!(SESSIONS_STARTED.get() >= 1);
    }
}

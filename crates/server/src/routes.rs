//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::ratelimit::ip_rate_limit_middleware;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Capability discovery
        .route("/v1/capabilities", get(handlers::get_capabilities))
        // Auth discovery
        .route("/v1/auth/whoami", get(handlers::whoami))
        // Health check (intentionally unauthenticated for probes)
        .route("/v1/health", get(handlers::health_check))
        // Release catalog
        .route("/v1/releases", get(handlers::list_releases))
        .route("/v1/releases/latest", get(handlers::get_latest_release))
        .route("/v1/releases/{version}", get(handlers::get_release))
        // Download session control plane
        .route("/v1/downloads", post(handlers::init_download))
        .route("/v1/downloads/cooldown", get(handlers::cooldown_status))
        .route(
            "/v1/downloads/{token}/progress",
            post(handlers::report_progress),
        )
        .route(
            "/v1/downloads/{token}/complete",
            post(handlers::complete_download),
        )
        .route(
            "/v1/downloads/{token}/cancel",
            post(handlers::cancel_download),
        )
        // Catalog registration (admin capability required)
        .route("/v1/admin/releases", post(handlers::publish_release));

    let mut router = api_routes;

    // SECURITY: when enabled, this endpoint must be network-restricted
    // to authorized Prometheus scraper IPs only.
    if state.config.server.metrics_enabled {
        router = router.merge(Router::new().route("/metrics", get(metrics_handler)));
    }

    let rate_limit_state = state.rate_limit.clone();

    // Middleware layers are applied in reverse order (outermost first).
    // Order of execution: TraceLayer -> IP rate limit -> Auth -> Handler
    router
        // Auth middleware (resolves credentials and sets the Identity extension)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Per-IP throttling (runs before auth, catches unauthenticated abuse)
        .layer(middleware::from_fn_with_state(
            rate_limit_state,
            ip_rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

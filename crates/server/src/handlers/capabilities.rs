//! Capability discovery endpoint.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Capabilities response.
#[derive(Debug, Serialize)]
pub struct CapabilitiesResponse {
    /// API version.
    pub api_version: &'static str,
    /// Seconds a user must wait between two successful downloads.
    pub cooldown_secs: u64,
    /// Minimum percentage of the expected size accepted at completion.
    pub size_tolerance_percent: u64,
}

/// GET /v1/capabilities
pub async fn get_capabilities(
    State(state): State<AppState>,
) -> ApiResult<Json<CapabilitiesResponse>> {
    Ok(Json(CapabilitiesResponse {
        api_version: "v1",
        cooldown_secs: state.config.downloads.cooldown_secs,
        size_tolerance_percent: hangar_core::SIZE_TOLERANCE_PERCENT,
    }))
}

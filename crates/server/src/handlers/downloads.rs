//! Download session control plane handlers.
//!
//! Thin bindings from HTTP to the lifecycle engine. `init` and the
//! cooldown query authenticate the caller; progress/complete/cancel
//! authorize by token possession alone, since the unguessable token
//! names exactly one session.

use crate::auth::require_identity;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{parse_json_body, parse_json_body_or_default};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use hangar_core::DownloadToken;
use hangar_core::session::{
    CancelRequest, CompleteRequest, CompleteResponse, CooldownStatusResponse, InitDownloadRequest,
    InitDownloadResponse, ProgressRequest,
};

/// POST /v1/downloads - open a download session.
#[tracing::instrument(skip(state, req))]
pub async fn init_download(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<InitDownloadResponse>)> {
    let identity = require_identity(&req)?;
    let body: InitDownloadRequest = parse_json_body_or_default(req).await?;

    let response = state
        .engine
        .init(&identity, body.version.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /v1/downloads/{token}/progress - advisory progress report.
///
/// Always acks. A malformed or unknown token is indistinguishable from a
/// terminal session and must not fail the caller.
pub async fn report_progress(
    State(state): State<AppState>,
    Path(token): Path<String>,
    req: Request,
) -> ApiResult<StatusCode> {
    match DownloadToken::parse(&token) {
        Ok(token) => {
            let body: ProgressRequest = match parse_json_body(req).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(error = %e, "malformed progress body, ignored");
                    return Ok(StatusCode::NO_CONTENT);
                }
            };
            state.engine.progress(&token, body.observed_bytes).await;
        }
        Err(_) => {
            tracing::debug!("malformed progress token, ignored");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/downloads/{token}/complete - verify and credit a completion.
pub async fn complete_download(
    State(state): State<AppState>,
    Path(token): Path<String>,
    req: Request,
) -> ApiResult<Json<CompleteResponse>> {
    let token = DownloadToken::parse(&token).map_err(|_| ApiError::InvalidToken)?;
    let body: CompleteRequest = parse_json_body(req).await?;

    let response = state.engine.complete(&token, &body).await?;
    Ok(Json(response))
}

/// POST /v1/downloads/{token}/cancel - abandon a session.
///
/// Acks whether or not the session was still active, so a client on a
/// flaky network can fire-and-forget this on teardown.
pub async fn cancel_download(
    State(state): State<AppState>,
    Path(token): Path<String>,
    req: Request,
) -> ApiResult<StatusCode> {
    let Ok(token) = DownloadToken::parse(&token) else {
        return Ok(StatusCode::NO_CONTENT);
    };
    let body: CancelRequest = parse_json_body(req).await?;
    let reason = hangar_core::CancelReason::from_client(&body.reason);

    state.engine.cancel(&token, reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/downloads/cooldown - the caller's cooldown state.
pub async fn cooldown_status(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<CooldownStatusResponse>> {
    let identity = require_identity(&req)?;
    let status = state.engine.cooldown_status(identity.user_id).await;
    Ok(Json(CooldownStatusResponse {
        eligible: status.eligible,
        remaining_secs: status.remaining_secs(),
    }))
}

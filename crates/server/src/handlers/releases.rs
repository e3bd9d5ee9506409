//! Release catalog handlers.
//!
//! The catalog read path is public; registration requires the admin
//! capability. Publishing the package bytes themselves happens elsewhere
//! (static hosting or an object store); the catalog only records what
//! clients may retrieve.

use crate::auth::require_admin;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::parse_json_body;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use hangar_core::release::{PublishReleaseRequest, ReleaseInfo};
use hangar_metadata::models::ReleaseRow;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

fn to_release_info(row: ReleaseRow) -> ReleaseInfo {
    ReleaseInfo {
        version: row.version,
        filename: row.filename,
        expected_size: row.expected_size.max(0) as u64,
        is_latest: row.is_latest,
        download_count: row.download_count.max(0) as u64,
        published_at: row
            .published_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| row.published_at.to_string()),
    }
}

/// GET /v1/releases - list the catalog, newest first.
pub async fn list_releases(State(state): State<AppState>) -> ApiResult<Json<Vec<ReleaseInfo>>> {
    let rows = state.metadata.list_releases().await?;
    Ok(Json(rows.into_iter().map(to_release_info).collect()))
}

/// GET /v1/releases/latest
pub async fn get_latest_release(State(state): State<AppState>) -> ApiResult<Json<ReleaseInfo>> {
    let row = state
        .metadata
        .get_latest_release()
        .await?
        .ok_or_else(|| ApiError::NotFound("no release is flagged latest".to_string()))?;
    Ok(Json(to_release_info(row)))
}

/// GET /v1/releases/{version}
pub async fn get_release(
    State(state): State<AppState>,
    Path(version): Path<String>,
) -> ApiResult<Json<ReleaseInfo>> {
    let row = state
        .metadata
        .get_release_by_version(&version)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("release version '{version}' not found")))?;
    Ok(Json(to_release_info(row)))
}

/// POST /v1/admin/releases - register a release.
#[tracing::instrument(skip(state, req))]
pub async fn publish_release(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<ReleaseInfo>)> {
    let identity = require_admin(&req)?;
    let body: PublishReleaseRequest = parse_json_body(req).await?;

    if body.version.trim().is_empty() {
        return Err(ApiError::BadRequest("version must not be empty".to_string()));
    }
    if body.filename.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "filename must not be empty".to_string(),
        ));
    }
    let expected_size = i64::try_from(body.expected_size).map_err(|_| {
        ApiError::BadRequest(format!(
            "expected_size {} exceeds maximum supported size",
            body.expected_size
        ))
    })?;

    let now = OffsetDateTime::now_utc();
    let row = ReleaseRow {
        release_id: Uuid::new_v4(),
        version: body.version.trim().to_string(),
        filename: body.filename.trim().to_string(),
        expected_size,
        is_latest: body.make_latest,
        download_count: 0,
        notes: body.notes,
        published_at: now,
        updated_at: now,
    };

    match state.metadata.publish_release(&row).await {
        Ok(()) => {}
        Err(hangar_metadata::MetadataError::AlreadyExists(msg)) => {
            return Err(ApiError::Conflict(msg));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(version = %row.version, make_latest = row.is_latest, "release registered");
    state
        .engine
        .audit()
        .record(
            &identity.user_id.to_string(),
            "release.publish",
            &row.version,
            Some(serde_json::json!({
                "filename": row.filename,
                "expected_size": row.expected_size,
                "make_latest": row.is_latest,
            })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(to_release_info(row))))
}

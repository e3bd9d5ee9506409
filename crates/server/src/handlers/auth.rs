//! Auth discovery endpoint.

use crate::auth::require_identity;
use crate::error::ApiResult;
use axum::Json;
use axum::extract::Request;
use serde::Serialize;

/// Identity view returned to the caller.
#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub user_id: String,
    pub verified: bool,
    pub is_admin: bool,
}

/// GET /v1/auth/whoami
pub async fn whoami(req: Request) -> ApiResult<Json<WhoamiResponse>> {
    let identity = require_identity(&req)?;
    Ok(Json(WhoamiResponse {
        user_id: identity.user_id.to_string(),
        verified: identity.verified,
        is_admin: identity.is_admin,
    }))
}

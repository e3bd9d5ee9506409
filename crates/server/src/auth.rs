//! Authentication middleware resolving bearer credentials to identities.
//!
//! The identity collaborator boundary: whatever credential the caller
//! presents is hashed and resolved to an [`Identity`] value here, and
//! handlers receive that value explicitly. Nothing downstream reads
//! request state ambiently.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use hangar_core::Identity;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Extract a bearer credential from the Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_credential(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(&v[7..])
            } else {
                None
            }
        })
}

/// Hash a credential for storage lookup.
pub fn hash_credential(credential: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credential.as_bytes());
    hex::encode(hasher.finalize())
}

/// Authentication middleware.
///
/// Resolves the bearer credential (when present and known) to an
/// [`Identity`] request extension. Requests without a resolvable
/// identity pass through; handlers decide whether one is required.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(credential) = extract_bearer_credential(&req) {
        let hash = hash_credential(credential);
        if let Some(row) = state.metadata.get_identity_by_credential(&hash).await? {
            let identity = Identity::new(row.user_id, row.verified, row.is_admin);

            // Last-seen stamp is best-effort bookkeeping.
            if let Err(e) = state
                .metadata
                .touch_identity(row.user_id, OffsetDateTime::now_utc())
                .await
            {
                tracing::debug!(user_id = %row.user_id, error = %e, "last-seen stamp failed");
            }

            req.extensions_mut().insert(identity);
        } else {
            tracing::debug!("unknown credential presented");
        }
    }

    Ok(next.run(req).await)
}

/// Get the resolved identity, or `Unauthenticated`.
pub fn require_identity(req: &Request) -> ApiResult<Identity> {
    req.extensions()
        .get::<Identity>()
        .copied()
        .ok_or(ApiError::Unauthenticated)
}

/// Get the resolved identity and require the admin capability.
pub fn require_admin(req: &Request) -> ApiResult<Identity> {
    let identity = require_identity(req)?;
    if !identity.is_admin {
        return Err(ApiError::Forbidden(
            "admin capability required".to_string(),
        ));
    }
    Ok(identity)
}

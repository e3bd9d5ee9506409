//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Download session record.
///
/// Sessions are an audit trail: the engine never deletes them, and a row
/// whose status is terminal is never updated again.
#[derive(Debug, Clone, FromRow)]
pub struct DownloadSessionRow {
    /// One-time session token (64 hex chars), primary key.
    pub token: String,
    pub owner_id: Uuid,
    pub release_id: Uuid,
    /// Catalog size snapshot taken at session start.
    pub expected_size: i64,
    pub observed_bytes: i64,
    /// One of: started, completed, failed, cancelled.
    pub status: String,
    pub started_at: OffsetDateTime,
    /// Stamped exactly once, on the transition out of `started`.
    pub completed_at: Option<OffsetDateTime>,
}

impl DownloadSessionRow {
    /// Build a row from a freshly opened domain session.
    pub fn from_session(session: &hangar_core::DownloadSession) -> Self {
        Self {
            token: session.token.as_str().to_string(),
            owner_id: session.owner_id,
            release_id: *session.release_id.as_uuid(),
            expected_size: i64::try_from(session.expected_size).unwrap_or(i64::MAX),
            observed_bytes: i64::try_from(session.observed_bytes).unwrap_or(i64::MAX),
            status: session.state.as_str().to_string(),
            started_at: session.started_at,
            completed_at: session.completed_at,
        }
    }
}

/// Release catalog record.
#[derive(Debug, Clone, FromRow)]
pub struct ReleaseRow {
    pub release_id: Uuid,
    pub version: String,
    pub filename: String,
    pub expected_size: i64,
    /// At most one release carries this flag (partial unique index).
    pub is_latest: bool,
    pub download_count: i64,
    pub notes: Option<String>,
    pub published_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Per-user download profile.
///
/// Created lazily by the first successful completion; both fields are
/// only ever written together, inside the completion transaction.
#[derive(Debug, Clone, FromRow)]
pub struct UserProfileRow {
    pub user_id: Uuid,
    pub last_completed_at: Option<OffsetDateTime>,
    pub total_completions: i64,
}

/// Identity record resolved from a presented credential.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityRow {
    pub user_id: Uuid,
    /// SHA-256 hex of the bearer credential.
    pub credential_hash: String,
    pub display_name: Option<String>,
    pub verified: bool,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
    pub last_seen_at: Option<OffsetDateTime>,
}

/// Append-only audit record.
#[derive(Debug, Clone, FromRow)]
pub struct AuditRecordRow {
    pub audit_id: Uuid,
    /// Acting user ID, or "system" for bootstrap actions.
    pub actor: String,
    /// Dotted action name, e.g. "download.complete".
    pub action: String,
    /// Identifier of the affected entity (session token, release version).
    pub subject: String,
    /// JSON detail payload.
    pub detail: Option<String>,
    pub recorded_at: OffsetDateTime,
}

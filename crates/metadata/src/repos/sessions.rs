//! Download session repository.

use crate::error::MetadataResult;
use crate::models::DownloadSessionRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Result of a successful completion commit.
#[derive(Debug, Clone)]
pub struct CompletionReceipt {
    /// Owner credited with the completion.
    pub owner_id: Uuid,
    /// Release whose download counter was incremented.
    pub release_id: Uuid,
    /// The owner's lifetime completion count after this commit.
    pub total_completions: i64,
}

/// Repository for download session operations.
///
/// A session leaves `started` at most once. The two finalizing methods
/// enforce this with conditional updates inside the store's transaction,
/// so concurrent finalizers resolve to exactly one winner.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Persist a freshly opened session.
    async fn create_session(&self, session: &DownloadSessionRow) -> MetadataResult<()>;

    /// Get a session by token.
    async fn get_session(&self, token: &str) -> MetadataResult<Option<DownloadSessionRow>>;

    /// Overwrite the reported byte count of a `started` session.
    ///
    /// Advisory: a token that is unknown or already terminal is a no-op,
    /// not an error, and the status column is never touched.
    async fn record_progress(&self, token: &str, observed_bytes: i64) -> MetadataResult<()>;

    /// Atomically commit a completion, as one transaction:
    /// transition the session from `started` to `completed` (stamping
    /// `observed_bytes` and `completed_at`), increment the release's
    /// download counter, and advance the owner's profile
    /// (`last_completed_at`, `total_completions`).
    ///
    /// Returns `None` without any side effect when the token is unknown
    /// or the session is no longer `started` (a concurrent finalizer
    /// won). Any mid-transaction failure rolls everything back, leaving
    /// the session `started` and retriable.
    async fn commit_completion(
        &self,
        token: &str,
        observed_bytes: i64,
        completed_at: OffsetDateTime,
    ) -> MetadataResult<Option<CompletionReceipt>>;

    /// Transition a `started` session to `failed` or `cancelled`,
    /// stamping `completed_at` and, when given, the final byte count.
    /// No counters are touched.
    ///
    /// Returns whether this call won the transition; `false` means the
    /// token was unknown or already terminal.
    async fn finalize_session(
        &self,
        token: &str,
        terminal_status: &str,
        observed_bytes: Option<i64>,
        completed_at: OffsetDateTime,
    ) -> MetadataResult<bool>;

    /// Count sessions opened by one user, for operational visibility.
    async fn count_sessions_for_owner(&self, owner_id: Uuid) -> MetadataResult<u64>;
}

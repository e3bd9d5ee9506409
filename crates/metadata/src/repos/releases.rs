//! Release catalog repository.

use crate::error::MetadataResult;
use crate::models::ReleaseRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for release catalog operations.
#[async_trait]
pub trait ReleaseRepo: Send + Sync {
    /// Register a release. When the row is flagged latest, the previous
    /// latest flag is cleared in the same transaction, so at most one
    /// release carries it.
    ///
    /// Fails with `AlreadyExists` for a duplicate version string.
    async fn publish_release(&self, release: &ReleaseRow) -> MetadataResult<()>;

    /// Get a release by ID.
    async fn get_release(&self, release_id: Uuid) -> MetadataResult<Option<ReleaseRow>>;

    /// Get a release by its version string.
    async fn get_release_by_version(&self, version: &str) -> MetadataResult<Option<ReleaseRow>>;

    /// Get the release flagged latest, if any.
    async fn get_latest_release(&self) -> MetadataResult<Option<ReleaseRow>>;

    /// List all releases, newest first.
    async fn list_releases(&self) -> MetadataResult<Vec<ReleaseRow>>;
}

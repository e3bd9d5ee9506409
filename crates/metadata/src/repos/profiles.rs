//! User download profile repository.

use crate::error::MetadataResult;
use crate::models::UserProfileRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for per-user download profiles.
///
/// The completion transaction in [`crate::repos::SessionRepo`] is the
/// only production writer; `upsert_profile` exists for operational
/// backfill and test seeding.
#[async_trait]
pub trait ProfileRepo: Send + Sync {
    /// Get a user's profile. `None` for a user who has never completed
    /// a download.
    async fn get_profile(&self, user_id: Uuid) -> MetadataResult<Option<UserProfileRow>>;

    /// Insert or replace a profile row verbatim.
    async fn upsert_profile(&self, profile: &UserProfileRow) -> MetadataResult<()>;
}

//! Identity repository.
//!
//! The identity provider boundary: the server resolves a presented
//! credential hash to an identity row here and hands the engine only the
//! resulting capability flags.

use crate::error::MetadataResult;
use crate::models::IdentityRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for identity records.
#[async_trait]
pub trait IdentityRepo: Send + Sync {
    /// Create an identity.
    async fn create_identity(&self, identity: &IdentityRow) -> MetadataResult<()>;

    /// Get an identity by user ID.
    async fn get_identity(&self, user_id: Uuid) -> MetadataResult<Option<IdentityRow>>;

    /// Resolve a credential hash to an identity.
    async fn get_identity_by_credential(
        &self,
        credential_hash: &str,
    ) -> MetadataResult<Option<IdentityRow>>;

    /// Stamp the identity's last-seen time.
    async fn touch_identity(&self, user_id: Uuid, seen_at: OffsetDateTime) -> MetadataResult<()>;

    /// Grant or revoke the admin flag.
    async fn set_admin(&self, user_id: Uuid, is_admin: bool) -> MetadataResult<()>;

    /// Get the bootstrap admin identity recorded at startup, if any.
    async fn get_bootstrap_admin_id(&self) -> MetadataResult<Option<Uuid>>;

    /// Record which identity is the bootstrap admin.
    async fn set_bootstrap_admin_id(&self, user_id: Uuid) -> MetadataResult<()>;
}

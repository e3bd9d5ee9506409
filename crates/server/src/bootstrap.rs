//! Bootstrap admin identity initialization.

use anyhow::{Result, bail};
use hangar_core::config::AdminConfig;
use hangar_metadata::MetadataStore;
use hangar_metadata::models::IdentityRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Ensure an admin identity exists for the configured credential hash.
///
/// If the hash changes between restarts, the previous bootstrap admin is
/// demoted and a new identity is created with the new hash. Manually
/// created admins are never touched.
pub async fn ensure_admin_identity(
    metadata: &dyn MetadataStore,
    config: &AdminConfig,
) -> Result<()> {
    // Normalize to lowercase to match auth.rs hash_credential(), which
    // emits lowercase hex. Uppercase hashes in config would otherwise
    // never match during authentication.
    let hash = config
        .credential_hash
        .strip_prefix("sha256:")
        .unwrap_or(&config.credential_hash)
        .to_lowercase();
    if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("invalid admin credential_hash: expected 64 hex chars");
    }

    if let Some(existing) = metadata.get_identity_by_credential(&hash).await? {
        if !existing.is_admin {
            metadata.set_admin(existing.user_id, true).await?;
            tracing::info!(user_id = %existing.user_id, "existing identity promoted to admin");
        }
        metadata.set_bootstrap_admin_id(existing.user_id).await?;
        tracing::debug!("Admin identity already exists");
        return Ok(());
    }

    if let Some(prev_id) = metadata.get_bootstrap_admin_id().await? {
        // The previous bootstrap admin's credential no longer matches
        // the configured hash; its admin capability goes with it.
        if let Err(e) = metadata.set_admin(prev_id, false).await {
            tracing::warn!(user_id = %prev_id, error = %e, "could not demote previous bootstrap admin");
        } else {
            tracing::info!(user_id = %prev_id, "previous bootstrap admin demoted");
        }
    }

    let identity = IdentityRow {
        user_id: Uuid::new_v4(),
        credential_hash: hash,
        display_name: config.display_name.clone(),
        verified: true,
        is_admin: true,
        created_at: OffsetDateTime::now_utc(),
        last_seen_at: None,
    };

    metadata.create_identity(&identity).await?;
    metadata.set_bootstrap_admin_id(identity.user_id).await?;
    tracing::info!(user_id = %identity.user_id, "Admin identity created");

    Ok(())
}

//! Metadata store abstraction and implementations for Hangar.
//!
//! This crate provides the control-plane data model:
//! - Download sessions and their at-most-once terminal transitions
//! - The release catalog and per-release download counters
//! - Per-user download profiles feeding the cooldown policy
//! - Identities and their capability flags
//! - The append-only audit trail

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use store::{MetadataStore, SqliteStore};

use hangar_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}

//! Core domain types and shared logic for the Hangar distribution backend.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Download tokens and the session lifecycle state machine
//! - Caller identity as resolved by the identity collaborator
//! - Release catalog identifiers and wire types
//! - The per-user cooldown policy
//! - Completion integrity verification
//! - Configuration types

pub mod config;
pub mod cooldown;
pub mod error;
pub mod identity;
pub mod integrity;
pub mod release;
pub mod session;

pub use cooldown::CooldownPolicy;
pub use error::{Error, Result};
pub use identity::Identity;
pub use integrity::{SIZE_TOLERANCE_PERCENT, completion_accepted, meets_size_tolerance};
pub use release::{ReleaseId, ReleaseInfo};
pub use session::{CancelReason, DownloadSession, DownloadToken, SessionState};

/// Default cooldown between two successful downloads: 5 minutes.
pub const DEFAULT_COOLDOWN_SECS: u64 = 300;

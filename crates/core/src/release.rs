//! Release catalog types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a catalog release.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseId(Uuid);

impl ReleaseId {
    /// Generate a new random release ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidRelease(format!("invalid release ID: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReleaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ReleaseId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReleaseId({})", self.0)
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public view of one catalog entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// Release version string, e.g. "1.4.2".
    pub version: String,
    /// Package file name to retrieve.
    pub filename: String,
    /// Expected package size in bytes (0 if unknown).
    pub expected_size: u64,
    /// Whether this is the release served when no version is requested.
    pub is_latest: bool,
    /// Completed downloads credited to this release.
    pub download_count: u64,
    /// When the release was registered, RFC 3339.
    pub published_at: String,
}

/// Request to register a release in the catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublishReleaseRequest {
    /// Version string; must be unique.
    pub version: String,
    /// Package file name clients will retrieve.
    pub filename: String,
    /// Expected package size in bytes. Zero means unknown, which
    /// disables size verification for downloads of this release.
    pub expected_size: u64,
    /// Free-form release notes.
    pub notes: Option<String>,
    /// Flag this release as latest, replacing the previous flag.
    #[serde(default = "default_make_latest")]
    pub make_latest: bool,
}

fn default_make_latest() -> bool {
    true
}

//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping.
    /// When enabled, restrict the endpoint to scraper IPs at the
    /// infrastructure level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Download lifecycle configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Minimum seconds between two successful downloads by one user.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_cooldown_secs() -> u64 {
    crate::DEFAULT_COOLDOWN_SECS
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl DownloadConfig {
    /// Get the cooldown window as a Duration.
    pub fn cooldown(&self) -> Duration {
        let secs = i64::try_from(self.cooldown_secs).unwrap_or(i64::MAX);
        Duration::seconds(secs)
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database file.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
        }
    }
}

/// Per-IP request throttling configuration.
///
/// This is the generic HTTP abuse guard in front of the API; the per-user
/// download cooldown is configured separately in [`DownloadConfig`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether per-IP throttling is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Sustained requests per minute allowed per IP.
    #[serde(default = "default_ip_requests_per_minute")]
    pub ip_requests_per_minute: u32,
    /// Burst allowance on top of the sustained rate.
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
    /// Maximum tracked IPs before new ones are rejected.
    #[serde(default = "default_max_entries")]
    pub max_entries: u32,
    /// Seconds of inactivity before a tracked IP is evicted.
    #[serde(default = "default_entry_ttl_secs")]
    pub entry_ttl_secs: u64,
    /// Seconds between cleanup passes.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Proxies whose forwarded headers are trusted for client IPs.
    /// Empty (default) trusts no headers; "*" trusts all sources.
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

fn default_ip_requests_per_minute() -> u32 {
    120
}

fn default_burst_size() -> u32 {
    10
}

fn default_max_entries() -> u32 {
    100_000
}

fn default_entry_ttl_secs() -> u64 {
    600
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ip_requests_per_minute: default_ip_requests_per_minute(),
            burst_size: default_burst_size(),
            max_entries: default_max_entries(),
            entry_ttl_secs: default_entry_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl RateLimitConfig {
    /// Validate the configuration. Returns warnings for risky-but-legal
    /// settings, or an error for settings that cannot work.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        if !self.enabled {
            return Ok(warnings);
        }

        if self.ip_requests_per_minute == 0 {
            return Err("rate_limit.ip_requests_per_minute must be > 0".to_string());
        }
        if self.max_entries == 0 {
            return Err("rate_limit.max_entries must be > 0".to_string());
        }

        if self.trusted_proxies.iter().any(|p| p == "*") {
            warnings.push(
                "rate_limit.trusted_proxies contains \"*\": forwarded headers from any \
                 source will be trusted, which allows IP spoofing"
                    .to_string(),
            );
        }
        if self.entry_ttl_secs == 0 {
            warnings.push(
                "rate_limit.entry_ttl_secs is 0: every cleanup pass evicts all entries"
                    .to_string(),
            );
        }

        Ok(warnings)
    }
}

/// Bootstrap admin identity configuration.
///
/// The admin identity can register releases. If the credential hash
/// changes between restarts, the previous bootstrap admin is demoted and
/// a new identity is created for the new hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Pre-computed hash of the admin credential (SHA-256 hex, 64 chars).
    /// Generate with: `echo -n "your-secret-credential" | sha256sum`
    pub credential_hash: String,
    /// Display name for the admin identity.
    pub display_name: Option<String>,
}

impl AdminConfig {
    /// Create a test configuration with a fixed credential hash.
    ///
    /// **For testing only.** The hash is SHA-256 of "test-admin-credential".
    pub fn for_testing() -> Self {
        Self {
            credential_hash: "f8cd66a2cf3566fda4851a4a3fe6fe234c977ce83d946e58cd96037b8e48c60b"
                .to_string(),
            display_name: Some("Test admin".to_string()),
        }
    }
}

/// Top-level application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub downloads: DownloadConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    /// Create a configuration with test-friendly defaults.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            metadata: MetadataConfig::default(),
            downloads: DownloadConfig::default(),
            rate_limit: RateLimitConfig::default(),
            admin: AdminConfig::for_testing(),
        }
    }
}

//! Download session types and lifecycle.

use crate::release::ReleaseId;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Number of random bytes backing a download token (256 bits of entropy).
const TOKEN_BYTES: usize = 32;

/// Opaque one-time token naming a single download attempt.
///
/// Tokens are never reused; possession of the token is the capability to
/// report progress and finalize the session it names.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadToken(String);

impl DownloadToken {
    /// Generate a fresh token from OS entropy.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut buf = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut buf);
        Self(hex::encode(buf))
    }

    /// Parse from a string, validating shape only.
    pub fn parse(s: &str) -> crate::Result<Self> {
        if s.len() != TOKEN_BYTES * 2 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::Error::InvalidToken(format!(
                "token must be {} hex characters",
                TOKEN_BYTES * 2
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Get the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DownloadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a prefix; full tokens are capabilities and stay out of logs.
        write!(f, "DownloadToken({}..)", &self.0[..8])
    }
}

impl fmt::Display for DownloadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Session is open; the client is retrieving bytes out-of-band.
    Started,
    /// Retrieval verified and credited.
    Completed,
    /// Retrieval rejected or abandoned on error.
    Failed,
    /// Deliberately abandoned by the client.
    Cancelled,
}

impl SessionState {
    /// Check if the session can still be finalized.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Started)
    }

    /// Check if the session reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Get the string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse from the database representation.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(crate::Error::InvalidState(format!(
                "unknown session state: {s}"
            ))),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a client abandoned a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// The user explicitly aborted the download.
    UserAbort,
    /// The client hit a transfer or local error.
    Error,
}

impl CancelReason {
    /// Map a client-supplied reason string.
    ///
    /// Anything that is not an explicit user abort counts as an error,
    /// so unknown reason strings land in `failed` rather than `cancelled`.
    pub fn from_client(s: &str) -> Self {
        match s {
            "user-abort" | "user_abort" | "abort" => Self::UserAbort,
            _ => Self::Error,
        }
    }

    /// Terminal state this reason resolves the session to.
    pub fn terminal_state(&self) -> SessionState {
        match self {
            Self::UserAbort => SessionState::Cancelled,
            Self::Error => SessionState::Failed,
        }
    }
}

/// One download attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadSession {
    /// The one-time session token.
    pub token: DownloadToken,
    /// Identity that opened the session.
    pub owner_id: Uuid,
    /// Release being retrieved.
    pub release_id: ReleaseId,
    /// Byte size snapshotted from the catalog at session start.
    ///
    /// A snapshot, not a live reference: later catalog changes do not
    /// affect sessions already in flight. Zero means the size was
    /// unknown when the session was opened.
    pub expected_size: u64,
    /// Last byte count the client reported.
    pub observed_bytes: u64,
    /// Current lifecycle state.
    pub state: SessionState,
    /// When the session was opened.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    /// When the session left `started`. Set exactly once.
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl DownloadSession {
    /// Open a new session for `owner_id` against a catalog snapshot.
    pub fn new(owner_id: Uuid, release_id: ReleaseId, expected_size: u64) -> Self {
        Self {
            token: DownloadToken::generate(),
            owner_id,
            release_id,
            expected_size,
            observed_bytes: 0,
            state: SessionState::Started,
            started_at: OffsetDateTime::now_utc(),
            completed_at: None,
        }
    }
}

/// Request to open a download session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InitDownloadRequest {
    /// Target release version. Absent means the release flagged latest.
    pub version: Option<String>,
}

/// Response from opening a download session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitDownloadResponse {
    /// The one-time session token.
    pub token: String,
    /// Resolved release version.
    pub version: String,
    /// File name to retrieve out-of-band.
    pub filename: String,
    /// Expected size in bytes (0 if unknown).
    pub expected_size: u64,
}

/// Advisory progress report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressRequest {
    /// Bytes retrieved so far, as measured by the client.
    pub observed_bytes: u64,
}

/// Request to finalize a session as completed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompleteRequest {
    /// Final byte count as measured by the client.
    pub observed_bytes: u64,
    /// Client assertion that the retrieval finished. Covers retrieval
    /// paths where the byte count cannot be observed (e.g. a redirect
    /// to an external host).
    #[serde(default)]
    pub verified: bool,
}

/// Response from a successful completion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompleteResponse {
    /// The owner's lifetime completion count, including this one.
    pub total_completions: u64,
}

/// Request to abandon a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CancelRequest {
    /// Client-supplied reason, e.g. "user-abort" or "error".
    pub reason: String,
}

/// Cooldown state for one user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CooldownStatusResponse {
    /// Whether the user may open a new session right now.
    pub eligible: bool,
    /// Seconds until the next session may be opened (0 when eligible).
    pub remaining_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let token = DownloadToken::generate();
        assert_eq!(token.as_str().len(), 64);
        let parsed = DownloadToken::parse(token.as_str()).unwrap();
        assert_eq!(token, parsed);
    }

    #[test]
    fn test_token_parse_rejects_bad_shapes() {
        assert!(DownloadToken::parse("short").is_err());
        assert!(DownloadToken::parse(&"g".repeat(64)).is_err());
        assert!(DownloadToken::parse(&"a".repeat(63)).is_err());
        assert!(DownloadToken::parse(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_token_parse_normalizes_case() {
        let upper = "ABCDEF0123456789".repeat(4);
        let parsed = DownloadToken::parse(&upper).unwrap();
        assert_eq!(parsed.as_str(), upper.to_ascii_lowercase());
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = DownloadToken::generate();
        let b = DownloadToken::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_debug_is_truncated() {
        let token = DownloadToken::generate();
        let debug = format!("{token:?}");
        assert!(debug.len() < 64);
        assert!(debug.starts_with("DownloadToken("));
    }

    #[test]
    fn test_state_flags() {
        assert!(SessionState::Started.is_active());
        assert!(!SessionState::Started.is_terminal());
        for state in [
            SessionState::Completed,
            SessionState::Failed,
            SessionState::Cancelled,
        ] {
            assert!(!state.is_active());
            assert!(state.is_terminal());
        }
    }

    #[test]
    fn test_state_roundtrip() {
        for state in [
            SessionState::Started,
            SessionState::Completed,
            SessionState::Failed,
            SessionState::Cancelled,
        ] {
            assert_eq!(SessionState::parse(state.as_str()).unwrap(), state);
        }
        assert!(SessionState::parse("open").is_err());
    }

    #[test]
    fn test_cancel_reason_mapping() {
        assert_eq!(
            CancelReason::from_client("user-abort").terminal_state(),
            SessionState::Cancelled
        );
        assert_eq!(
            CancelReason::from_client("error").terminal_state(),
            SessionState::Failed
        );
        // Unknown reasons are conservative.
        assert_eq!(
            CancelReason::from_client("something-else").terminal_state(),
            SessionState::Failed
        );
    }

    #[test]
    fn test_new_session_starts_clean() {
        let session = DownloadSession::new(Uuid::new_v4(), ReleaseId::new(), 1024);
        assert_eq!(session.state, SessionState::Started);
        assert_eq!(session.observed_bytes, 0);
        assert!(session.completed_at.is_none());
    }
}

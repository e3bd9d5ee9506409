//! Download session lifecycle engine.
//!
//! Ties the release catalog, the cooldown gate, and the session store
//! together: opens sessions, accepts advisory progress, verifies and
//! credits completions, and resolves abandonment. All persistence goes
//! through the injected repository interface, so the engine is testable
//! without HTTP and without a real deployment database.

use crate::audit::BestEffortAudit;
use crate::cooldown::{CooldownGate, CooldownStatus};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use hangar_core::session::{
    CancelReason, CompleteRequest, CompleteResponse, InitDownloadResponse,
};
use hangar_core::{CooldownPolicy, DownloadSession, DownloadToken, Identity, completion_accepted};
use hangar_metadata::MetadataStore;
use hangar_metadata::models::DownloadSessionRow;
use hangar_metadata::repos::ProfileRepo;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// The session lifecycle engine.
#[derive(Clone)]
pub struct SessionEngine {
    metadata: Arc<dyn MetadataStore>,
    gate: CooldownGate,
    audit: BestEffortAudit,
}

impl SessionEngine {
    /// Build an engine over a metadata store.
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        policy: CooldownPolicy,
        audit: BestEffortAudit,
    ) -> Self {
        let profiles: Arc<dyn ProfileRepo> = metadata.clone();
        let gate = CooldownGate::new(profiles, policy);
        Self {
            metadata,
            gate,
            audit,
        }
    }

    /// The cooldown gate used by this engine.
    pub fn gate(&self) -> &CooldownGate {
        &self.gate
    }

    /// The audit sink used by this engine.
    pub fn audit(&self) -> &BestEffortAudit {
        &self.audit
    }

    /// Open a download session.
    ///
    /// Preconditions: the identity is verified and outside its cooldown
    /// window. Resolves `version` against the catalog (absent means the
    /// release flagged latest) and snapshots its expected size into the
    /// new session. This is the only state-creating operation.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn init(
        &self,
        identity: &Identity,
        version: Option<&str>,
    ) -> ApiResult<InitDownloadResponse> {
        if !identity.verified {
            return Err(ApiError::Unverified);
        }

        let status = self.gate.status(identity.user_id).await;
        if !status.eligible {
            metrics::COOLDOWN_REJECTIONS.inc();
            return Err(ApiError::CooldownActive {
                remaining_secs: status.remaining_secs(),
            });
        }

        let release = match version {
            Some(v) => self.metadata.get_release_by_version(v).await?,
            None => self.metadata.get_latest_release().await?,
        };
        let Some(release) = release else {
            return Err(ApiError::NotFound(match version {
                Some(v) => format!("release version '{v}' not found"),
                None => "no release is flagged latest".to_string(),
            }));
        };

        let session = DownloadSession::new(
            identity.user_id,
            release.release_id.into(),
            release.expected_size.max(0) as u64,
        );
        let token = session.token.clone();
        self.metadata
            .create_session(&DownloadSessionRow::from_session(&session))
            .await?;

        metrics::SESSIONS_STARTED.inc();
        tracing::info!(
            token = ?token,
            version = %release.version,
            "download session opened"
        );
        self.audit
            .record(
                &identity.user_id.to_string(),
                "download.init",
                token.as_str(),
                Some(serde_json::json!({
                    "version": release.version,
                    "expected_size": release.expected_size,
                })),
            )
            .await;

        Ok(InitDownloadResponse {
            token: token.as_str().to_string(),
            version: release.version,
            filename: release.filename,
            expected_size: release.expected_size as u64,
        })
    }

    /// Record an advisory progress report.
    ///
    /// Never fails the caller and never changes session status: unknown
    /// or terminal tokens, out-of-range values, and storage errors all
    /// degrade to a logged no-op.
    pub async fn progress(&self, token: &DownloadToken, observed_bytes: u64) {
        let Ok(bytes) = i64::try_from(observed_bytes) else {
            tracing::debug!(token = ?token, observed_bytes, "progress value out of range, ignored");
            return;
        };
        if let Err(e) = self.metadata.record_progress(token.as_str(), bytes).await {
            tracing::warn!(token = ?token, error = %e, "progress write failed, ignored");
        }
    }

    /// Verify and credit a completion.
    ///
    /// Exactly one caller can move a session out of `started`. The
    /// winner's counter and profile updates commit atomically with the
    /// transition; everyone else gets `InvalidToken`.
    #[tracing::instrument(skip(self, token, request), fields(token = ?token))]
    pub async fn complete(
        &self,
        token: &DownloadToken,
        request: &CompleteRequest,
    ) -> ApiResult<CompleteResponse> {
        let session = self
            .metadata
            .get_session(token.as_str())
            .await?
            .ok_or(ApiError::InvalidToken)?;
        if session.status != "started" {
            return Err(ApiError::InvalidToken);
        }

        let observed = request.observed_bytes;
        if i64::try_from(observed).is_err() {
            return Err(ApiError::BadRequest(format!(
                "observed_bytes {observed} exceeds maximum supported size"
            )));
        }
        let expected = session.expected_size as u64;

        if !completion_accepted(expected, observed, request.verified) {
            let now = OffsetDateTime::now_utc();
            let transitioned = self
                .metadata
                .finalize_session(token.as_str(), "failed", Some(observed as i64), now)
                .await?;
            if !transitioned {
                // A concurrent finalizer got there first.
                return Err(ApiError::InvalidToken);
            }

            metrics::SESSIONS_FAILED.inc();
            tracing::info!(observed, expected, "completion rejected, size below tolerance");
            self.audit
                .record(
                    &session.owner_id.to_string(),
                    "download.reject",
                    token.as_str(),
                    Some(serde_json::json!({
                        "observed": observed,
                        "expected": expected,
                    })),
                )
                .await;
            return Err(ApiError::SizeMismatch { observed, expected });
        }

        // A zero report on an accepted completion means the client could
        // not measure; credit the catalog size instead.
        let final_bytes = if observed == 0 { expected } else { observed };
        let now = OffsetDateTime::now_utc();
        let receipt = self
            .metadata
            .commit_completion(token.as_str(), final_bytes as i64, now)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        metrics::SESSIONS_COMPLETED.inc();
        tracing::info!(
            user_id = %receipt.owner_id,
            total_completions = receipt.total_completions,
            "download completed"
        );
        self.audit
            .record(
                &receipt.owner_id.to_string(),
                "download.complete",
                token.as_str(),
                Some(serde_json::json!({
                    "observed": final_bytes,
                    "expected": expected,
                    "client_asserted": request.verified,
                    "total_completions": receipt.total_completions,
                })),
            )
            .await;

        Ok(CompleteResponse {
            total_completions: receipt.total_completions.max(0) as u64,
        })
    }

    /// Resolve an abandoned session.
    ///
    /// A deliberate abort lands in `cancelled`, an error in `failed`;
    /// neither touches any counter, so an incomplete retrieval never
    /// consumes the owner's cooldown. Unknown or already terminal tokens
    /// are acknowledged as no-ops.
    #[tracing::instrument(skip(self, token), fields(token = ?token))]
    pub async fn cancel(&self, token: &DownloadToken, reason: CancelReason) -> ApiResult<()> {
        let Some(session) = self.metadata.get_session(token.as_str()).await? else {
            return Ok(());
        };

        let terminal = reason.terminal_state();
        let now = OffsetDateTime::now_utc();
        let transitioned = self
            .metadata
            .finalize_session(token.as_str(), terminal.as_str(), None, now)
            .await?;

        if transitioned {
            metrics::SESSIONS_ABANDONED.inc();
            tracing::info!(state = %terminal, "download session abandoned");
            self.audit
                .record(
                    &session.owner_id.to_string(),
                    "download.cancel",
                    token.as_str(),
                    Some(serde_json::json!({ "state": terminal.as_str() })),
                )
                .await;
        }

        Ok(())
    }

    /// Current cooldown state for one user.
    pub async fn cooldown_status(&self, user_id: Uuid) -> CooldownStatus {
        self.gate.status(user_id).await
    }
}

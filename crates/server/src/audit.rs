//! Best-effort audit sink.

use hangar_metadata::models::AuditRecordRow;
use hangar_metadata::repos::AuditRepo;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Append-or-warn wrapper around the audit repository.
///
/// Audit must never roll back or block the operation it describes, so
/// failures are logged and swallowed here instead of being caught ad hoc
/// at every call site. Tests can hand this a failing repo and assert the
/// primary operation still succeeds.
#[derive(Clone)]
pub struct BestEffortAudit {
    sink: Arc<dyn AuditRepo>,
}

impl BestEffortAudit {
    /// Wrap an audit repository.
    pub fn new(sink: Arc<dyn AuditRepo>) -> Self {
        Self { sink }
    }

    /// Append one audit record, swallowing any failure.
    pub async fn record(
        &self,
        actor: &str,
        action: &str,
        subject: &str,
        detail: Option<serde_json::Value>,
    ) {
        let record = AuditRecordRow {
            audit_id: Uuid::new_v4(),
            actor: actor.to_string(),
            action: action.to_string(),
            subject: subject.to_string(),
            detail: detail.map(|d| d.to_string()),
            recorded_at: OffsetDateTime::now_utc(),
        };

        if let Err(e) = self.sink.append_audit(&record).await {
            tracing::warn!(
                action = action,
                subject = subject,
                error = %e,
                "audit append failed, continuing without record"
            );
        }
    }
}

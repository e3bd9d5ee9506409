//! Audit trail repository.

use crate::error::MetadataResult;
use crate::models::AuditRecordRow;
use async_trait::async_trait;

/// Repository for the append-only audit trail.
#[async_trait]
pub trait AuditRepo: Send + Sync {
    /// Append one immutable audit record.
    async fn append_audit(&self, record: &AuditRecordRow) -> MetadataResult<()>;

    /// List records for one subject, newest first.
    async fn list_audit_for_subject(
        &self,
        subject: &str,
        limit: u32,
    ) -> MetadataResult<Vec<AuditRecordRow>>;
}

//! Metadata store trait and SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{AuditRepo, IdentityRepo, ProfileRepo, ReleaseRepo, SessionRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore:
    SessionRepo + ReleaseRepo + ProfileRepo + IdentityRepo + AuditRepo + Send + Sync
{
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store and run migrations.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MetadataError::Internal(format!("cannot create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under server concurrency
            // and makes the completion transaction's winner selection trivial.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "sqlite metadata store opened");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use crate::repos::CompletionReceipt;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl SessionRepo for SqliteStore {
        async fn create_session(&self, session: &DownloadSessionRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO download_sessions (
                    token, owner_id, release_id, expected_size,
                    observed_bytes, status, started_at, completed_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&session.token)
            .bind(session.owner_id)
            .bind(session.release_id)
            .bind(session.expected_size)
            .bind(session.observed_bytes)
            .bind(&session.status)
            .bind(session.started_at)
            .bind(session.completed_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_session(&self, token: &str) -> MetadataResult<Option<DownloadSessionRow>> {
            let row = sqlx::query_as::<_, DownloadSessionRow>(
                "SELECT * FROM download_sessions WHERE token = ?",
            )
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn record_progress(&self, token: &str, observed_bytes: i64) -> MetadataResult<()> {
            // The status guard keeps terminal sessions immutable. A token
            // that matches nothing is a successful no-op.
            sqlx::query(
                "UPDATE download_sessions SET observed_bytes = ? WHERE token = ? AND status = 'started'",
            )
            .bind(observed_bytes)
            .bind(token)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn commit_completion(
            &self,
            token: &str,
            observed_bytes: i64,
            completed_at: OffsetDateTime,
        ) -> MetadataResult<Option<CompletionReceipt>> {
            // Session transition, release counter, and profile advance
            // commit as one transaction. Two finalizers racing on the same
            // token both reach the conditional UPDATE, but only one can
            // observe status = 'started'; the loser sees zero rows
            // affected and reports back without side effects.
            let mut tx = self.pool.begin().await?;

            let session = sqlx::query_as::<_, DownloadSessionRow>(
                "SELECT * FROM download_sessions WHERE token = ?",
            )
            .bind(token)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(session) = session else {
                return Ok(None);
            };
            if session.status != "started" {
                return Ok(None);
            }

            let updated = sqlx::query(
                r#"
                UPDATE download_sessions
                SET status = 'completed', observed_bytes = ?, completed_at = ?
                WHERE token = ? AND status = 'started'
                "#,
            )
            .bind(observed_bytes)
            .bind(completed_at)
            .bind(token)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                // Lost the race after the read; roll back the transaction.
                return Ok(None);
            }

            sqlx::query(
                "UPDATE releases SET download_count = download_count + 1, updated_at = ? WHERE release_id = ?",
            )
            .bind(completed_at)
            .bind(session.release_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO user_profiles (user_id, last_completed_at, total_completions)
                VALUES (?, ?, 1)
                ON CONFLICT(user_id) DO UPDATE SET
                    last_completed_at = excluded.last_completed_at,
                    total_completions = user_profiles.total_completions + 1
                "#,
            )
            .bind(session.owner_id)
            .bind(completed_at)
            .execute(&mut *tx)
            .await?;

            let total_completions: i64 = sqlx::query_scalar(
                "SELECT total_completions FROM user_profiles WHERE user_id = ?",
            )
            .bind(session.owner_id)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;

            Ok(Some(CompletionReceipt {
                owner_id: session.owner_id,
                release_id: session.release_id,
                total_completions,
            }))
        }

        async fn finalize_session(
            &self,
            token: &str,
            terminal_status: &str,
            observed_bytes: Option<i64>,
            completed_at: OffsetDateTime,
        ) -> MetadataResult<bool> {
            // Completions go through commit_completion; this path only
            // resolves abandonment.
            if !matches!(terminal_status, "failed" | "cancelled") {
                return Err(MetadataError::InvalidStateTransition {
                    from: "started".to_string(),
                    to: terminal_status.to_string(),
                });
            }

            let result = match observed_bytes {
                Some(bytes) => {
                    sqlx::query(
                        r#"
                        UPDATE download_sessions
                        SET status = ?, observed_bytes = ?, completed_at = ?
                        WHERE token = ? AND status = 'started'
                        "#,
                    )
                    .bind(terminal_status)
                    .bind(bytes)
                    .bind(completed_at)
                    .bind(token)
                    .execute(&self.pool)
                    .await?
                }
                None => {
                    sqlx::query(
                        r#"
                        UPDATE download_sessions
                        SET status = ?, completed_at = ?
                        WHERE token = ? AND status = 'started'
                        "#,
                    )
                    .bind(terminal_status)
                    .bind(completed_at)
                    .bind(token)
                    .execute(&self.pool)
                    .await?
                }
            };

            Ok(result.rows_affected() > 0)
        }

        async fn count_sessions_for_owner(&self, owner_id: Uuid) -> MetadataResult<u64> {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM download_sessions WHERE owner_id = ?")
                    .bind(owner_id)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count as u64)
        }
    }

    #[async_trait]
    impl ReleaseRepo for SqliteStore {
        async fn publish_release(&self, release: &ReleaseRow) -> MetadataResult<()> {
            let mut tx = self.pool.begin().await?;

            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM releases WHERE version = ?)")
                    .bind(&release.version)
                    .fetch_one(&mut *tx)
                    .await?;
            if exists {
                return Err(MetadataError::AlreadyExists(format!(
                    "release version '{}' already exists",
                    release.version
                )));
            }

            if release.is_latest {
                // The partial unique index permits one latest flag; clear
                // the previous holder in the same transaction.
                sqlx::query("UPDATE releases SET is_latest = 0, updated_at = ? WHERE is_latest = 1")
                    .bind(release.updated_at)
                    .execute(&mut *tx)
                    .await?;
            }

            sqlx::query(
                r#"
                INSERT INTO releases (
                    release_id, version, filename, expected_size,
                    is_latest, download_count, notes, published_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(release.release_id)
            .bind(&release.version)
            .bind(&release.filename)
            .bind(release.expected_size)
            .bind(release.is_latest)
            .bind(release.download_count)
            .bind(&release.notes)
            .bind(release.published_at)
            .bind(release.updated_at)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(())
        }

        async fn get_release(&self, release_id: Uuid) -> MetadataResult<Option<ReleaseRow>> {
            let row = sqlx::query_as::<_, ReleaseRow>("SELECT * FROM releases WHERE release_id = ?")
                .bind(release_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_release_by_version(
            &self,
            version: &str,
        ) -> MetadataResult<Option<ReleaseRow>> {
            let row = sqlx::query_as::<_, ReleaseRow>("SELECT * FROM releases WHERE version = ?")
                .bind(version)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_latest_release(&self) -> MetadataResult<Option<ReleaseRow>> {
            let row = sqlx::query_as::<_, ReleaseRow>("SELECT * FROM releases WHERE is_latest = 1")
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_releases(&self) -> MetadataResult<Vec<ReleaseRow>> {
            let rows =
                sqlx::query_as::<_, ReleaseRow>("SELECT * FROM releases ORDER BY published_at DESC")
                    .fetch_all(&self.pool)
                    .await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl ProfileRepo for SqliteStore {
        async fn get_profile(&self, user_id: Uuid) -> MetadataResult<Option<UserProfileRow>> {
            let row =
                sqlx::query_as::<_, UserProfileRow>("SELECT * FROM user_profiles WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn upsert_profile(&self, profile: &UserProfileRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO user_profiles (user_id, last_completed_at, total_completions)
                VALUES (?, ?, ?)
                ON CONFLICT(user_id) DO UPDATE SET
                    last_completed_at = excluded.last_completed_at,
                    total_completions = excluded.total_completions
                "#,
            )
            .bind(profile.user_id)
            .bind(profile.last_completed_at)
            .bind(profile.total_completions)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }

    #[async_trait]
    impl IdentityRepo for SqliteStore {
        async fn create_identity(&self, identity: &IdentityRow) -> MetadataResult<()> {
            let result = sqlx::query(
                r#"
                INSERT INTO identities (
                    user_id, credential_hash, display_name,
                    verified, is_admin, created_at, last_seen_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(identity.user_id)
            .bind(&identity.credential_hash)
            .bind(&identity.display_name)
            .bind(identity.verified)
            .bind(identity.is_admin)
            .bind(identity.created_at)
            .bind(identity.last_seen_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(db_err))
                    if db_err.message().contains("UNIQUE constraint") =>
                {
                    Err(MetadataError::AlreadyExists(
                        "identity with this user ID or credential already exists".to_string(),
                    ))
                }
                Err(e) => Err(e.into()),
            }
        }

        async fn get_identity(&self, user_id: Uuid) -> MetadataResult<Option<IdentityRow>> {
            let row = sqlx::query_as::<_, IdentityRow>("SELECT * FROM identities WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_identity_by_credential(
            &self,
            credential_hash: &str,
        ) -> MetadataResult<Option<IdentityRow>> {
            let row = sqlx::query_as::<_, IdentityRow>(
                "SELECT * FROM identities WHERE credential_hash = ?",
            )
            .bind(credential_hash)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn touch_identity(
            &self,
            user_id: Uuid,
            seen_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            sqlx::query("UPDATE identities SET last_seen_at = ? WHERE user_id = ?")
                .bind(seen_at)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn set_admin(&self, user_id: Uuid, is_admin: bool) -> MetadataResult<()> {
            let result = sqlx::query("UPDATE identities SET is_admin = ? WHERE user_id = ?")
                .bind(is_admin)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!(
                    "identity {user_id} not found"
                )));
            }
            Ok(())
        }

        async fn get_bootstrap_admin_id(&self) -> MetadataResult<Option<Uuid>> {
            let id: Option<Option<Uuid>> = sqlx::query_scalar(
                "SELECT bootstrap_admin_id FROM bootstrap_state WHERE id = 1",
            )
            .fetch_optional(&self.pool)
            .await?;
            Ok(id.flatten())
        }

        async fn set_bootstrap_admin_id(&self, user_id: Uuid) -> MetadataResult<()> {
            sqlx::query("UPDATE bootstrap_state SET bootstrap_admin_id = ? WHERE id = 1")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }
    }

    #[async_trait]
    impl AuditRepo for SqliteStore {
        async fn append_audit(&self, record: &AuditRecordRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO audit_records (audit_id, actor, action, subject, detail, recorded_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.audit_id)
            .bind(&record.actor)
            .bind(&record.action)
            .bind(&record.subject)
            .bind(&record.detail)
            .bind(record.recorded_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn list_audit_for_subject(
            &self,
            subject: &str,
            limit: u32,
        ) -> MetadataResult<Vec<AuditRecordRow>> {
            let rows = sqlx::query_as::<_, AuditRecordRow>(
                "SELECT * FROM audit_records WHERE subject = ? ORDER BY recorded_at DESC LIMIT ?",
            )
            .bind(subject)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Release catalog
CREATE TABLE IF NOT EXISTS releases (
    release_id BLOB PRIMARY KEY,
    version TEXT NOT NULL UNIQUE,
    filename TEXT NOT NULL,
    expected_size INTEGER NOT NULL,
    is_latest INTEGER NOT NULL DEFAULT 0,
    download_count INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    published_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
-- Only one release can be flagged latest at a time (partial unique index)
CREATE UNIQUE INDEX IF NOT EXISTS idx_releases_latest ON releases(is_latest) WHERE is_latest = 1;

-- Download sessions (append-only audit trail; terminal rows are immutable)
CREATE TABLE IF NOT EXISTS download_sessions (
    token TEXT PRIMARY KEY,
    owner_id BLOB NOT NULL,
    release_id BLOB NOT NULL REFERENCES releases(release_id),
    expected_size INTEGER NOT NULL,
    observed_bytes INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'started',
    started_at TEXT NOT NULL,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_download_sessions_owner ON download_sessions(owner_id, status);
CREATE INDEX IF NOT EXISTS idx_download_sessions_release ON download_sessions(release_id);

-- Per-user download profiles
CREATE TABLE IF NOT EXISTS user_profiles (
    user_id BLOB PRIMARY KEY,
    last_completed_at TEXT,
    total_completions INTEGER NOT NULL DEFAULT 0
);

-- Identities (credential hash -> capability flags)
CREATE TABLE IF NOT EXISTS identities (
    user_id BLOB PRIMARY KEY,
    credential_hash TEXT NOT NULL UNIQUE,
    display_name TEXT,
    verified INTEGER NOT NULL DEFAULT 0,
    is_admin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_seen_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_identities_credential ON identities(credential_hash);

-- Bootstrap marker
CREATE TABLE IF NOT EXISTS bootstrap_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    bootstrap_admin_id BLOB
);
INSERT OR IGNORE INTO bootstrap_state (id, bootstrap_admin_id) VALUES (1, NULL);

-- Audit trail (append-only)
CREATE TABLE IF NOT EXISTS audit_records (
    audit_id BLOB PRIMARY KEY,
    actor TEXT NOT NULL,
    action TEXT NOT NULL,
    subject TEXT NOT NULL,
    detail TEXT,
    recorded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_subject ON audit_records(subject, recorded_at);
"#;

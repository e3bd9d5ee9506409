//! Server test utilities.

use hangar_core::config::AppConfig;
use hangar_metadata::models::{IdentityRow, ReleaseRow, UserProfileRow};
use hangar_metadata::{MetadataStore, SqliteStore};
use hangar_server::{AppState, create_router};
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;
use uuid::Uuid;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("metadata.db");

        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );

        let mut config = AppConfig::for_testing();
        modifier(&mut config);

        let state = AppState::new(config, metadata);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying metadata store.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// Create an identity and return the raw credential to present.
    pub async fn create_identity(&self, verified: bool, is_admin: bool) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        let credential = format!("test-credential-{}", Uuid::new_v4());
        let row = IdentityRow {
            user_id,
            credential_hash: super::fixtures::sha256_hash(credential.as_bytes()),
            display_name: Some("Test user".to_string()),
            verified,
            is_admin,
            created_at: OffsetDateTime::now_utc(),
            last_seen_at: None,
        };
        self.metadata()
            .create_identity(&row)
            .await
            .expect("Failed to create identity");
        (user_id, credential)
    }

    /// Register a release directly in the catalog.
    pub async fn seed_release(&self, version: &str, expected_size: i64, is_latest: bool) -> Uuid {
        let now = OffsetDateTime::now_utc();
        let row = ReleaseRow {
            release_id: Uuid::new_v4(),
            version: version.to_string(),
            filename: format!("app-{version}.apk"),
            expected_size,
            is_latest,
            download_count: 0,
            notes: None,
            published_at: now,
            updated_at: now,
        };
        self.metadata()
            .publish_release(&row)
            .await
            .expect("Failed to seed release");
        row.release_id
    }

    /// Seed a user profile, e.g. to place a user mid-cooldown.
    pub async fn seed_profile(
        &self,
        user_id: Uuid,
        last_completed_at: Option<OffsetDateTime>,
        total_completions: i64,
    ) {
        self.metadata()
            .upsert_profile(&UserProfileRow {
                user_id,
                last_completed_at,
                total_completions,
            })
            .await
            .expect("Failed to seed profile");
    }
}

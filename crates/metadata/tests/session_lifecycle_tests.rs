//! Session lifecycle tests against the SQLite store.

use hangar_metadata::SqliteStore;
use hangar_metadata::error::MetadataError;
use hangar_metadata::models::{DownloadSessionRow, ReleaseRow};
use hangar_metadata::repos::{ReleaseRepo, SessionRepo};
use tempfile::TempDir;
use time::OffsetDateTime;
use uuid::Uuid;

async fn build_store() -> (TempDir, SqliteStore) {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = SqliteStore::new(temp.path().join("metadata.db"))
        .await
        .expect("store");
    (temp, store)
}

async fn seed_release(store: &SqliteStore, version: &str, expected_size: i64) -> Uuid {
    let now = OffsetDateTime::now_utc();
    let row = ReleaseRow {
        release_id: Uuid::new_v4(),
        version: version.to_string(),
        filename: format!("app-{version}.apk"),
        expected_size,
        is_latest: true,
        download_count: 0,
        notes: None,
        published_at: now,
        updated_at: now,
    };
    store.publish_release(&row).await.expect("publish");
    row.release_id
}

fn sample_token() -> String {
    // Deterministic hex token shape; uniqueness comes from the UUID.
    format!("{:0>64}", Uuid::new_v4().simple().to_string())
}

async fn open_session(store: &SqliteStore, release_id: Uuid, owner_id: Uuid) -> String {
    let token = sample_token();
    let row = DownloadSessionRow {
        token: token.clone(),
        owner_id,
        release_id,
        expected_size: 1_000_000,
        observed_bytes: 0,
        status: "started".to_string(),
        started_at: OffsetDateTime::now_utc(),
        completed_at: None,
    };
    store.create_session(&row).await.expect("create session");
    token
}

#[tokio::test]
async fn create_and_get_roundtrip() {
    let (_temp, store) = build_store().await;
    let release_id = seed_release(&store, "1.0.0", 1_000_000).await;
    let owner_id = Uuid::new_v4();
    let token = open_session(&store, release_id, owner_id).await;

    let session = store.get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.owner_id, owner_id);
    assert_eq!(session.release_id, release_id);
    assert_eq!(session.status, "started");
    assert_eq!(session.observed_bytes, 0);
    assert!(session.completed_at.is_none());

    assert!(store.get_session(&sample_token()).await.unwrap().is_none());
}

#[tokio::test]
async fn progress_updates_only_started_sessions() {
    let (_temp, store) = build_store().await;
    let release_id = seed_release(&store, "1.0.0", 1_000_000).await;
    let token = open_session(&store, release_id, Uuid::new_v4()).await;

    store.record_progress(&token, 500_000).await.unwrap();
    let session = store.get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.observed_bytes, 500_000);
    assert_eq!(session.status, "started");

    // Progress on an unknown token is a no-op, not an error.
    store
        .record_progress(&sample_token(), 123)
        .await
        .unwrap();

    // Terminal sessions are immutable to progress.
    let now = OffsetDateTime::now_utc();
    assert!(
        store
            .finalize_session(&token, "cancelled", None, now)
            .await
            .unwrap()
    );
    store.record_progress(&token, 999_999).await.unwrap();
    let session = store.get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.observed_bytes, 500_000);
    assert_eq!(session.status, "cancelled");
}

#[tokio::test]
async fn finalize_wins_at_most_once() {
    let (_temp, store) = build_store().await;
    let release_id = seed_release(&store, "1.0.0", 1_000_000).await;
    let token = open_session(&store, release_id, Uuid::new_v4()).await;
    let now = OffsetDateTime::now_utc();

    assert!(
        store
            .finalize_session(&token, "failed", Some(970_000), now)
            .await
            .unwrap()
    );
    // Second finalize of any kind loses.
    assert!(
        !store
            .finalize_session(&token, "cancelled", None, now)
            .await
            .unwrap()
    );

    let session = store.get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.status, "failed");
    assert_eq!(session.observed_bytes, 970_000);
    assert!(session.completed_at.is_some());
}

#[tokio::test]
async fn finalize_rejects_non_terminal_status() {
    let (_temp, store) = build_store().await;
    let release_id = seed_release(&store, "1.0.0", 1_000_000).await;
    let token = open_session(&store, release_id, Uuid::new_v4()).await;
    let now = OffsetDateTime::now_utc();

    let err = store
        .finalize_session(&token, "completed", None, now)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MetadataError::InvalidStateTransition { .. }
    ));
    // The guard never touched the row.
    let session = store.get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.status, "started");
}

#[tokio::test]
async fn finalize_unknown_token_reports_no_win() {
    let (_temp, store) = build_store().await;
    let now = OffsetDateTime::now_utc();
    assert!(
        !store
            .finalize_session(&sample_token(), "cancelled", None, now)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn count_sessions_for_owner() {
    let (_temp, store) = build_store().await;
    let release_id = seed_release(&store, "1.0.0", 1_000_000).await;
    let owner_id = Uuid::new_v4();

    assert_eq!(store.count_sessions_for_owner(owner_id).await.unwrap(), 0);
    open_session(&store, release_id, owner_id).await;
    open_session(&store, release_id, owner_id).await;
    open_session(&store, release_id, Uuid::new_v4()).await;
    assert_eq!(store.count_sessions_for_owner(owner_id).await.unwrap(), 2);
}

//! Integration tests for the preference store: the settings blob, the
//! bookmark/read-later id lists, and the setup flag, exercised end-to-end
//! the way a session uses them across restarts.
//!
//! Each test creates its own in-memory SQLite database for isolation.

use newswire::settings::{Settings, Theme};
use newswire::storage::{Database, BOOKMARKS_KEY, READ_LATER_KEY};
use pretty_assertions::assert_eq;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

#[tokio::test]
async fn test_settings_survive_reload() {
    let db = test_db().await;

    let mut settings = Settings::default();
    settings.news_sources = vec!["international".to_string(), "domestic".to_string()];
    settings.articles_per_page = 24;
    settings.auto_refresh = true;
    settings.refresh_interval_ms = 60_000;
    settings.theme = Theme::Dark;
    db.save_settings(&settings).await.unwrap();

    // Simulate a restart with a second handle to the same store.
    let restored = db.clone().load_settings().await.unwrap();
    assert_eq!(restored, settings);
}

#[tokio::test]
async fn test_settings_blob_written_as_json() {
    let db = test_db().await;
    db.save_settings(&Settings::default()).await.unwrap();

    let blob = db.get_preference("settings").await.unwrap().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&blob).unwrap();
    assert_eq!(parsed["articles_per_page"], 12);
    assert_eq!(parsed["theme"], "system");
}

#[tokio::test]
async fn test_older_partial_blob_still_loads() {
    let db = test_db().await;
    // A blob from a build that predates most settings keys.
    db.set_preference("settings", r#"{"news_sources": ["domestic"]}"#)
        .await
        .unwrap();

    let settings = db.load_settings().await.unwrap();
    assert_eq!(settings.news_sources, vec!["domestic".to_string()]);
    assert_eq!(settings.articles_per_page, 12);
    assert_eq!(settings.theme, Theme::System);
}

#[tokio::test]
async fn test_bookmark_and_read_later_lists_are_independent() {
    let db = test_db().await;

    db.save_id_list(BOOKMARKS_KEY, &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    db.save_id_list(READ_LATER_KEY, &["c".to_string()])
        .await
        .unwrap();

    assert_eq!(
        db.load_id_list(BOOKMARKS_KEY).await.unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );
    assert_eq!(
        db.load_id_list(READ_LATER_KEY).await.unwrap(),
        vec!["c".to_string()]
    );
}

#[tokio::test]
async fn test_id_list_overwrite_replaces_previous() {
    let db = test_db().await;

    db.save_id_list(BOOKMARKS_KEY, &["a".to_string()])
        .await
        .unwrap();
    db.save_id_list(BOOKMARKS_KEY, &["b".to_string()])
        .await
        .unwrap();

    assert_eq!(
        db.load_id_list(BOOKMARKS_KEY).await.unwrap(),
        vec!["b".to_string()]
    );
}

#[tokio::test]
async fn test_setup_flag_lifecycle() {
    let db = test_db().await;
    assert!(!db.setup_completed().await.unwrap());

    db.set_setup_completed(true).await.unwrap();
    assert!(db.setup_completed().await.unwrap());
}

#[tokio::test]
async fn test_corrupt_blobs_degrade_to_first_run_state() {
    let db = test_db().await;
    db.set_preference("settings", "{{{{").await.unwrap();
    db.set_preference(BOOKMARKS_KEY, "not a list").await.unwrap();

    assert_eq!(db.load_settings().await.unwrap(), Settings::default());
    assert!(db.load_id_list(BOOKMARKS_KEY).await.unwrap().is_empty());
}

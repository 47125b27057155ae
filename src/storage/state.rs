//! Typed accessors over the key→value store for the engine's persisted
//! state: the settings blob, the bookmark/read-later id lists, and the
//! setup-completed flag.
//!
//! Corrupt or missing blobs never fail a load; they log and fall back to
//! defaults, so a damaged store degrades to first-run behavior instead of
//! wedging startup.

use anyhow::Result;

use super::schema::Database;
use crate::settings::Settings;

/// Preference key for the serialized [`Settings`] blob.
pub const SETTINGS_KEY: &str = "settings";
/// Preference key for the bookmarked article id list.
pub const BOOKMARKS_KEY: &str = "bookmarked_articles";
/// Preference key for the read-later article id list.
pub const READ_LATER_KEY: &str = "read_later_articles";
/// Preference key for the onboarding-completed flag.
pub const SETUP_COMPLETED_KEY: &str = "setup_completed";

impl Database {
    /// Load settings, merging the stored blob over defaults.
    pub async fn load_settings(&self) -> Result<Settings> {
        let Some(blob) = self.get_preference(SETTINGS_KEY).await? else {
            return Ok(Settings::default());
        };
        match serde_json::from_str(&blob) {
            Ok(settings) => Ok(settings),
            Err(error) => {
                tracing::warn!(error = %error, "Stored settings unreadable, falling back to defaults");
                Ok(Settings::default())
            }
        }
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        let blob = serde_json::to_string(settings)?;
        self.set_preference(SETTINGS_KEY, &blob).await
    }

    /// Load a persisted article-id list (bookmarks or read-later).
    pub async fn load_id_list(&self, key: &str) -> Result<Vec<String>> {
        let Some(blob) = self.get_preference(key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&blob) {
            Ok(ids) => Ok(ids),
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "Stored id list unreadable, starting empty");
                Ok(Vec::new())
            }
        }
    }

    pub async fn save_id_list(&self, key: &str, ids: &[String]) -> Result<()> {
        let blob = serde_json::to_string(ids)?;
        self.set_preference(key, &blob).await
    }

    pub async fn setup_completed(&self) -> Result<bool> {
        Ok(self
            .get_preference(SETUP_COMPLETED_KEY)
            .await?
            .as_deref()
            == Some("true"))
    }

    pub async fn set_setup_completed(&self, completed: bool) -> Result<()> {
        self.set_preference(SETUP_COMPLETED_KEY, if completed { "true" } else { "false" })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_settings_default_when_missing() {
        let db = test_db().await;
        let settings = db.load_settings().await.unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let db = test_db().await;
        let mut settings = Settings::default();
        settings.articles_per_page = 24;
        settings.news_sources.push("domestic".to_string());

        db.save_settings(&settings).await.unwrap();
        let restored = db.load_settings().await.unwrap();
        assert_eq!(restored, settings);
    }

    #[tokio::test]
    async fn test_corrupt_settings_blob_falls_back_to_defaults() {
        let db = test_db().await;
        db.set_preference(SETTINGS_KEY, "not valid json {{")
            .await
            .unwrap();

        let settings = db.load_settings().await.unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[tokio::test]
    async fn test_partial_settings_blob_merges_defaults() {
        let db = test_db().await;
        db.set_preference(SETTINGS_KEY, r#"{"articles_per_page": 6}"#)
            .await
            .unwrap();

        let settings = db.load_settings().await.unwrap();
        assert_eq!(settings.articles_per_page, 6);
        assert_eq!(settings.language, "en");
    }

    #[tokio::test]
    async fn test_id_list_round_trip() {
        let db = test_db().await;
        let ids = vec!["a".to_string(), "b".to_string()];
        db.save_id_list(BOOKMARKS_KEY, &ids).await.unwrap();

        let restored = db.load_id_list(BOOKMARKS_KEY).await.unwrap();
        assert_eq!(restored, ids);
    }

    #[tokio::test]
    async fn test_id_list_empty_when_missing() {
        let db = test_db().await;
        let ids = db.load_id_list(READ_LATER_KEY).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_id_list_starts_empty() {
        let db = test_db().await;
        db.set_preference(BOOKMARKS_KEY, "[[[").await.unwrap();
        let ids = db.load_id_list(BOOKMARKS_KEY).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_setup_flag_defaults_false_and_persists() {
        let db = test_db().await;
        assert!(!db.setup_completed().await.unwrap());

        db.set_setup_completed(true).await.unwrap();
        assert!(db.setup_completed().await.unwrap());

        db.set_setup_completed(false).await.unwrap();
        assert!(!db.setup_completed().await.unwrap());
    }
}

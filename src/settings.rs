//! User settings: the preference shape persisted as a JSON blob.
//!
//! Loading merges the stored blob over [`Settings::default`] via
//! `#[serde(default)]`, so partial or older blobs deserialize cleanly
//! instead of failing on missing keys.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Active source names, in display order. Feeds are resolved per source
    /// via the catalog.
    pub news_sources: Vec<String>,
    pub articles_per_page: usize,
    /// UI language code (part of the cache key, not interpreted by the core).
    pub language: String,
    /// Preferred article language code (cache key component).
    pub content_language: String,
    pub notifications: bool,
    pub auto_refresh: bool,
    /// Auto-refresh period in milliseconds. Ignored while `auto_refresh` is off.
    pub refresh_interval_ms: u64,
    pub show_reading_time: bool,
    pub enable_social_share: bool,
    pub show_thumbnails: bool,
    pub has_seen_welcome: bool,
    /// Appearance preference. Opaque to the core; applied by the presentation
    /// layer.
    pub theme: Theme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            news_sources: vec!["international".to_string()],
            articles_per_page: 12,
            language: "en".to_string(),
            content_language: "en".to_string(),
            notifications: true,
            auto_refresh: false,
            refresh_interval_ms: 300_000,
            show_reading_time: true,
            enable_social_share: true,
            show_thumbnails: true,
            has_seen_welcome: true,
            theme: Theme::System,
        }
    }
}

impl Settings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.news_sources, vec!["international".to_string()]);
        assert_eq!(settings.articles_per_page, 12);
        assert_eq!(settings.language, "en");
        assert!(!settings.auto_refresh);
        assert_eq!(settings.refresh_interval_ms, 300_000);
        assert_eq!(settings.theme, Theme::System);
    }

    #[test]
    fn test_partial_blob_merges_over_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"articles_per_page": 24, "theme": "dark"}"#).unwrap();
        assert_eq!(settings.articles_per_page, 24);
        assert_eq!(settings.theme, Theme::Dark);
        // Everything else falls back to defaults.
        assert_eq!(settings.news_sources, vec!["international".to_string()]);
        assert!(settings.show_thumbnails);
    }

    #[test]
    fn test_round_trip() {
        let mut settings = Settings::default();
        settings.news_sources = vec!["international".to_string(), "domestic".to_string()];
        settings.auto_refresh = true;
        settings.refresh_interval_ms = 60_000;

        let json = serde_json::to_string(&settings).unwrap();
        let restored: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, settings);
    }

    #[test]
    fn test_refresh_interval_duration() {
        let mut settings = Settings::default();
        settings.refresh_interval_ms = 1_500;
        assert_eq!(settings.refresh_interval(), Duration::from_millis(1_500));
    }
}

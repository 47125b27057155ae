//! Static/configurable mapping from (source, category) to feed endpoint URLs.
//!
//! A *source* is a named grouping of feeds (e.g. `international`, `domestic`);
//! a *category* is a topical filter or the sentinel [`ALL_CATEGORIES`].
//! Resolution is pure configuration lookup with no I/O and no failure modes.
//! Unknown sources and absent (source, category) combinations are skipped
//! silently.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Sentinel category selecting every endpoint a source defines.
pub const ALL_CATEGORIES: &str = "all";

/// Endpoints configured for one source, as read from the config file.
///
/// `all` is the full endpoint list used for the [`ALL_CATEGORIES`] sentinel;
/// every other key is a category name mapping to its single endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub all: Vec<String>,
    #[serde(flatten)]
    pub categories: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct FeedCatalog {
    sources: BTreeMap<String, SourceConfig>,
}

impl FeedCatalog {
    /// An empty catalog. Mostly useful in tests.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in catalog mirroring the stock source configuration.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert_source(
            "international",
            source(
                &[
                    "https://rss.nytimes.com/services/xml/rss/nyt/World.xml",
                    "https://feeds.feedburner.com/TechCrunch",
                    "https://www.thenation.com/subject/politics/feed/",
                    "https://rss.nytimes.com/services/xml/rss/nyt/Sports.xml",
                    "https://variety.com/feed/",
                    "https://rss.nytimes.com/services/xml/rss/nyt/Health.xml",
                ],
                &[
                    ("World", "https://rss.nytimes.com/services/xml/rss/nyt/World.xml"),
                    ("Technology", "https://feeds.feedburner.com/TechCrunch"),
                    ("Politics", "https://www.thenation.com/subject/politics/feed/"),
                    ("Sports", "https://rss.nytimes.com/services/xml/rss/nyt/Sports.xml"),
                    ("Entertainment", "https://variety.com/feed/"),
                    ("Health", "https://rss.nytimes.com/services/xml/rss/nyt/Health.xml"),
                ],
            ),
        );
        catalog.insert_source(
            "domestic",
            source(
                &[
                    "https://english.onlinekhabar.com/feed",
                    "https://english.onlinekhabar.com/category/political/feed",
                    "https://techpana.com/feed/",
                    "https://www.nepalisansar.com/entertainment/feed/",
                    "https://swasthyakhabar.com/feed/",
                ],
                &[
                    ("World", "https://english.onlinekhabar.com/feed"),
                    ("Politics", "https://english.onlinekhabar.com/category/political/feed"),
                    ("Technology", "https://techpana.com/feed/"),
                    ("Sports", "https://english.onlinekhabar.com/category/sports/feed"),
                    ("Entertainment", "https://www.nepalisansar.com/entertainment/feed/"),
                    ("Health", "https://swasthyakhabar.com/feed/"),
                ],
            ),
        );
        catalog
    }

    /// Add or replace a source definition.
    pub fn insert_source(&mut self, name: &str, config: SourceConfig) {
        self.sources.insert(name.to_string(), config);
    }

    /// Layer config-file source definitions over this catalog.
    ///
    /// A configured source replaces the built-in source of the same name
    /// wholesale; there is no per-category merging.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, SourceConfig>) {
        for (name, config) in overrides {
            self.insert_source(name, config.clone());
        }
    }

    /// Names of all configured sources.
    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Resolve the feed endpoints to query for a (source-set, category)
    /// selection.
    ///
    /// For [`ALL_CATEGORIES`] this is the concatenation (not deduplicated) of
    /// each source's full endpoint list, in the order `sources` iterates. For
    /// a specific category it is the single configured endpoint per source;
    /// sources lacking the category contribute nothing. Unknown source names
    /// are logged and skipped.
    pub fn resolve(&self, sources: &[String], category: &str) -> Vec<String> {
        let mut endpoints = Vec::new();
        for name in sources {
            let Some(feeds) = self.sources.get(name) else {
                tracing::warn!(source = %name, "Unknown news source in settings, skipping");
                continue;
            };
            if category == ALL_CATEGORIES {
                endpoints.extend(feeds.all.iter().cloned());
            } else if let Some(endpoint) = feeds.categories.get(category) {
                endpoints.push(endpoint.clone());
            }
        }
        endpoints
    }
}

fn source(all: &[&str], categories: &[(&str, &str)]) -> SourceConfig {
    SourceConfig {
        all: all.iter().map(|s| s.to_string()).collect(),
        categories: categories
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

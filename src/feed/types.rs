use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source label used when the conversion backend omits the feed title.
pub const FALLBACK_SOURCE: &str = "Unknown Source";

// ============================================================================
// Wire Payload (feed-conversion backend)
// ============================================================================

/// Top-level response from the feed-conversion backend.
///
/// The backend converts an RSS/Atom feed into JSON. `status` is `"ok"` on
/// success; anything else means the backend could not convert the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub feed: Option<FeedMeta>,
    #[serde(default)]
    pub items: Vec<RawItem>,
}

/// Feed-level metadata from the conversion backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedMeta {
    pub title: String,
    pub link: String,
}

/// One unnormalized item as delivered by the conversion backend.
///
/// Every field is optional on the wire; missing fields deserialize to empty
/// strings so normalization can decide what survives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawItem {
    pub guid: String,
    pub link: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    pub thumbnail: String,
    pub enclosure: Option<Enclosure>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Enclosure {
    pub link: String,
}

// ============================================================================
// Article
// ============================================================================

/// A normalized feed entry, the unit everything downstream operates on.
///
/// `id` is the upstream guid when present, else the item link; it is what
/// dedup-on-merge and the bookmark/read-later lookups key on. The
/// `is_bookmarked`/`is_read_later` flags are derived at read time by the
/// query engine and are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    /// Raw publish date string as delivered upstream.
    pub pub_date: String,
    /// Parsed publish date; `None` when the raw string is unparseable.
    pub published: Option<DateTime<Utc>>,
    /// Human-readable origin label (feed title or [`FALLBACK_SOURCE`]).
    pub source: String,
    pub thumbnail: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub is_bookmarked: bool,
    #[serde(default)]
    pub is_read_later: bool,
}

/// Parse an upstream publish date.
///
/// The conversion backend emits `YYYY-MM-DD HH:MM:SS` (UTC); raw feeds use
/// RFC 2822 and occasionally RFC 3339, so all three are attempted. Returns
/// `None` for anything else; callers sort unparseable dates as the minimum
/// possible time rather than failing the item.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}

//! Feed fetching, normalization, and aggregation.
//!
//! The pipeline: resolved endpoint URLs go through [`FeedClient`] (one
//! request per feed against the conversion backend, soft-failure tolerant),
//! fan out concurrently in [`aggregate`], and come back as one merged,
//! sorted [`Article`] list plus a degraded-feed count.

mod aggregator;
mod client;
mod types;

pub use aggregator::{aggregate, AggregateOutcome};
pub use client::{Cancelled, FeedClient, FeedFetch, FetchError, FETCH_TIMEOUT};
pub use types::{parse_pub_date, Article, Enclosure, FeedMeta, FeedPayload, RawItem, FALLBACK_SOURCE};

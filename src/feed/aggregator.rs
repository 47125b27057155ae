use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future;

use crate::coordinator::Generation;
use crate::feed::client::{Cancelled, FeedClient, FeedFetch};
use crate::feed::types::{parse_pub_date, Article, RawItem, FALLBACK_SOURCE};

/// Result of one aggregation pass across every resolved endpoint.
#[derive(Debug, Default)]
pub struct AggregateOutcome {
    /// Merged, deduplicated, sorted (publish date descending) articles.
    pub articles: Vec<Article>,
    /// Feeds that soft-failed this round.
    pub failed_feeds: usize,
    pub total_feeds: usize,
}

impl AggregateOutcome {
    /// One or more feeds were unavailable; the result is the union of the
    /// feeds that did answer.
    pub fn is_degraded(&self) -> bool {
        self.failed_feeds > 0
    }
}

/// Fan out one fetch per endpoint and merge whatever settles.
///
/// All fetches run concurrently and the join waits for every one of them;
/// soft failures settle as empty item lists rather than aborting the round.
/// Supersession is the exception: each fetch races the generation's
/// cancellation signal, so a superseded aggregation unwinds promptly with
/// [`Cancelled`] and produces no partial result.
///
/// Identifier collisions across feeds are not deduplicated beyond
/// last-in-wins in fetch iteration order. That keeps the merge deterministic
/// and guarantees unique ids afterward, at the cost of silently preferring
/// whichever feed came later in the endpoint list.
pub async fn aggregate(
    client: &FeedClient,
    endpoints: &[String],
    generation: &Generation,
) -> Result<AggregateOutcome, Cancelled> {
    if endpoints.is_empty() {
        return Ok(AggregateOutcome::default());
    }

    let fetches = endpoints.iter().map(|endpoint| client.fetch(endpoint, generation));
    let settled = future::join_all(fetches).await;

    let mut fetched = Vec::with_capacity(settled.len());
    for result in settled {
        fetched.push(result?);
    }

    let outcome = merge(fetched, endpoints.len());
    tracing::info!(
        articles = outcome.articles.len(),
        failed = outcome.failed_feeds,
        total = outcome.total_feeds,
        "Aggregation settled"
    );
    Ok(outcome)
}

fn merge(fetches: Vec<FeedFetch>, total_feeds: usize) -> AggregateOutcome {
    let mut articles: Vec<Article> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut failed_feeds = 0;

    for fetch in fetches {
        if fetch.failed {
            failed_feeds += 1;
        }
        let source = fetch
            .feed_title
            .unwrap_or_else(|| FALLBACK_SOURCE.to_string());
        for item in fetch.items {
            let Some(article) = normalize(item, &source) else {
                continue;
            };
            match by_id.entry(article.id.clone()) {
                // Last writer wins; the slot keeps its merge position.
                Entry::Occupied(slot) => articles[*slot.get()] = article,
                Entry::Vacant(slot) => {
                    slot.insert(articles.len());
                    articles.push(article);
                }
            }
        }
    }

    // Newest first. Unparseable dates sort as the minimum possible time, and
    // the stable sort keeps merge order for ties.
    articles.sort_by_key(|article| std::cmp::Reverse(sort_instant(article)));

    AggregateOutcome {
        articles,
        failed_feeds,
        total_feeds,
    }
}

fn sort_instant(article: &Article) -> DateTime<Utc> {
    article.published.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Normalize one raw item into an [`Article`].
///
/// Identity is the upstream guid when present, else the link. Items carrying
/// neither have no usable identity for dedup or user-state lookup and are
/// dropped.
fn normalize(item: RawItem, source: &str) -> Option<Article> {
    let guid = item.guid.trim();
    let link = item.link.trim();
    let id = if !guid.is_empty() {
        guid.to_string()
    } else if !link.is_empty() {
        link.to_string()
    } else {
        tracing::debug!(title = %item.title, source = %source, "Dropping item without guid or link");
        return None;
    };

    let thumbnail = non_empty(item.thumbnail)
        .or_else(|| item.enclosure.and_then(|enclosure| non_empty(enclosure.link)));
    let published = parse_pub_date(&item.pub_date);

    Some(Article {
        id,
        title: item.title,
        description: item.description,
        link: item.link,
        pub_date: item.pub_date,
        published,
        source: source.to_string(),
        thumbnail,
        content: item.content,
        is_bookmarked: false,
        is_read_later: false,
    })
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

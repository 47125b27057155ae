//! The session: one explicitly owned aggregate holding settings, the TTL
//! cache, the bookmark/read-later sets, and the request coordinator.
//!
//! Nothing here is global: every session owns its state outright, so
//! multiple sessions (and tests) run in isolation. State lives behind a
//! mutex that is only ever held between await points; the concurrency in
//! play is overlapping feed fetches, not parallel mutation.
//!
//! Supersession is enforced at two points: every fetch races the
//! generation's cancellation signal (prompt unwind), and every commit
//! re-checks that its generation is still current (late stale completions
//! are discarded). A superseded load touches nothing: not the cache, not
//! the article list, not the loading flag, not the error notice.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::cache::{CacheKey, FeedCache};
use crate::catalog::{FeedCatalog, ALL_CATEGORIES};
use crate::coordinator::RequestCoordinator;
use crate::feed::{aggregate, Article, Cancelled, FeedClient};
use crate::query::page_view;
use crate::settings::Settings;
use crate::storage::{Database, BOOKMARKS_KEY, READ_LATER_KEY};

/// Single non-fatal notice shown when one or more feeds were unavailable
/// within an otherwise-successful aggregation.
pub const DEGRADED_NOTICE: &str = "Failed to load some news feeds. Showing available articles.";

/// Handle to one news session. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct NewsSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    db: Database,
    client: FeedClient,
    catalog: FeedCatalog,
    state: Mutex<SessionState>,
    coordinator: Mutex<RequestCoordinator>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.refresh_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

struct SessionState {
    settings: Settings,
    cache: FeedCache,
    bookmarked: HashSet<String>,
    read_later: HashSet<String>,
    articles: Vec<Article>,
    loading: bool,
    error: Option<String>,
    category: String,
    search_query: String,
    page: usize,
}

/// Snapshot of the request parameters one load runs under. Taken before the
/// first await so a load that gets superseded mid-flight still windows by
/// the values it was asked for.
struct Selector {
    key: CacheKey,
    category: String,
    sources: Vec<String>,
    query: String,
    page: usize,
    page_size: usize,
}

impl NewsSession {
    /// Open a session: load persisted settings and user-state lists, then
    /// start the auto-refresh timer if settings call for one.
    ///
    /// No aggregation runs yet; the presentation layer triggers the first
    /// load via [`set_category`](Self::set_category) or
    /// [`refresh`](Self::refresh).
    pub async fn open(db: Database, client: FeedClient, catalog: FeedCatalog) -> Result<Self> {
        let settings = db.load_settings().await?;
        let bookmarked: HashSet<String> =
            db.load_id_list(BOOKMARKS_KEY).await?.into_iter().collect();
        let read_later: HashSet<String> =
            db.load_id_list(READ_LATER_KEY).await?.into_iter().collect();

        let session = Self {
            inner: Arc::new(SessionInner {
                db,
                client,
                catalog,
                state: Mutex::new(SessionState {
                    settings,
                    cache: FeedCache::new(),
                    bookmarked,
                    read_later,
                    articles: Vec::new(),
                    loading: false,
                    error: None,
                    category: ALL_CATEGORIES.to_string(),
                    search_query: String::new(),
                    page: 1,
                }),
                coordinator: Mutex::new(RequestCoordinator::new()),
                refresh_task: Mutex::new(None),
            }),
        };
        session.apply_refresh_timer();
        Ok(session)
    }

    // ========================================================================
    // Read Side
    // ========================================================================

    /// The currently published page of articles.
    pub fn articles(&self) -> Vec<Article> {
        self.lock_state().articles.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().loading
    }

    /// Current non-fatal notice, if any ([`DEGRADED_NOTICE`]).
    pub fn error(&self) -> Option<String> {
        self.lock_state().error.clone()
    }

    pub fn category(&self) -> String {
        self.lock_state().category.clone()
    }

    pub fn search_query(&self) -> String {
        self.lock_state().search_query.clone()
    }

    pub fn page(&self) -> usize {
        self.lock_state().page
    }

    pub fn settings(&self) -> Settings {
        self.lock_state().settings.clone()
    }

    pub async fn setup_completed(&self) -> Result<bool> {
        self.inner.db.setup_completed().await
    }

    pub async fn complete_setup(&self) -> Result<()> {
        self.inner.db.set_setup_completed(true).await
    }

    // ========================================================================
    // Presentation Boundary Operations
    // ========================================================================

    /// Switch category and load its first page.
    pub async fn set_category(&self, category: &str) -> Result<()> {
        {
            let mut state = self.lock_state();
            state.category = category.to_string();
            state.page = 1;
        }
        self.load(false).await
    }

    /// Change the search text and load the first page of the filtered view.
    pub async fn set_search_query(&self, query: &str) -> Result<()> {
        {
            let mut state = self.lock_state();
            state.search_query = query.to_string();
            state.page = 1;
        }
        self.load(false).await
    }

    /// Jump to a page (1-based), replacing the published window.
    pub async fn set_page(&self, page: usize) -> Result<()> {
        {
            let mut state = self.lock_state();
            state.page = page;
        }
        self.load(false).await
    }

    /// Advance one page and append its articles to the published list
    /// (infinite-scroll semantics).
    pub async fn load_more(&self) -> Result<()> {
        {
            let mut state = self.lock_state();
            state.page += 1;
        }
        self.load(true).await
    }

    /// Force a fresh aggregation for the current selector, dropping its
    /// cache entry first.
    pub async fn refresh(&self) -> Result<()> {
        {
            let mut state = self.lock_state();
            let key = cache_key(&state);
            state.cache.invalidate(&key);
        }
        self.load(false).await
    }

    /// Toggle an article in or out of the bookmark set, persist the set, and
    /// re-annotate the published page.
    pub async fn toggle_bookmark(&self, article_id: &str) -> Result<()> {
        let ids = {
            let mut state = self.lock_state();
            if !state.bookmarked.remove(article_id) {
                state.bookmarked.insert(article_id.to_string());
            }
            let member = state.bookmarked.contains(article_id);
            for article in &mut state.articles {
                if article.id == article_id {
                    article.is_bookmarked = member;
                }
            }
            sorted_ids(&state.bookmarked)
        };
        self.inner.db.save_id_list(BOOKMARKS_KEY, &ids).await
    }

    /// Toggle an article in or out of the read-later set. Same shape as
    /// [`toggle_bookmark`](Self::toggle_bookmark).
    pub async fn toggle_read_later(&self, article_id: &str) -> Result<()> {
        let ids = {
            let mut state = self.lock_state();
            if !state.read_later.remove(article_id) {
                state.read_later.insert(article_id.to_string());
            }
            let member = state.read_later.contains(article_id);
            for article in &mut state.articles {
                if article.id == article_id {
                    article.is_read_later = member;
                }
            }
            sorted_ids(&state.read_later)
        };
        self.inner.db.save_id_list(READ_LATER_KEY, &ids).await
    }

    /// Persist new settings and apply their consequences: the auto-refresh
    /// timer is rebuilt when its knobs changed, and a source/language change
    /// reloads from page 1 (those are cache-key components, so the current
    /// view no longer matches).
    pub async fn save_settings(&self, settings: Settings) -> Result<()> {
        let (selection_changed, timer_changed) = {
            let mut state = self.lock_state();
            let old = &state.settings;
            let selection_changed = old.news_sources != settings.news_sources
                || old.language != settings.language
                || old.content_language != settings.content_language;
            let timer_changed = old.auto_refresh != settings.auto_refresh
                || old.refresh_interval_ms != settings.refresh_interval_ms;
            state.settings = settings.clone();
            if selection_changed {
                state.page = 1;
            }
            (selection_changed, timer_changed)
        };

        self.inner.db.save_settings(&settings).await?;

        if timer_changed {
            self.apply_refresh_timer();
        }
        if selection_changed {
            self.load(false).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Load Pipeline
    // ========================================================================

    /// Run the pipeline for the current selector: cache lookup, aggregation
    /// on miss, filter + window, publish.
    async fn load(&self, append: bool) -> Result<()> {
        let selector = self.selector();

        // Cache hit: serve the view synchronously, no generation involved.
        {
            let mut state = self.lock_state();
            let cached = state.cache.get(&selector.key).map(|data| {
                page_view(
                    data,
                    &selector.query,
                    selector.page,
                    selector.page_size,
                    &state.bookmarked,
                    &state.read_later,
                )
            });
            if let Some(page) = cached {
                tracing::debug!(page = selector.page, "Serving page from cache");
                publish_page(&mut state, page, append);
                return Ok(());
            }
        }

        // Miss: this load becomes the current generation, superseding any
        // in-flight one.
        let generation = self.lock_coordinator().begin();
        {
            let mut state = self.lock_state();
            state.loading = true;
            state.error = None;
        }

        let endpoints = self
            .inner
            .catalog
            .resolve(&selector.sources, &selector.category);
        let outcome = match aggregate(&self.inner.client, &endpoints, &generation).await {
            Ok(outcome) => outcome,
            Err(Cancelled) => {
                // Fully inert: the superseding load owns the loading flag and
                // error state now.
                tracing::debug!(generation = generation.id(), "Load superseded, discarding");
                return Ok(());
            }
        };

        let mut state = self.lock_state();
        if !self.lock_coordinator().settle(&generation) {
            return Ok(());
        }
        state.cache.put(selector.key.clone(), outcome.articles.clone());
        let page = page_view(
            &outcome.articles,
            &selector.query,
            selector.page,
            selector.page_size,
            &state.bookmarked,
            &state.read_later,
        );
        publish_page(&mut state, page, append);
        state.error = outcome.is_degraded().then(|| DEGRADED_NOTICE.to_string());
        state.loading = false;
        Ok(())
    }

    fn selector(&self) -> Selector {
        let state = self.lock_state();
        Selector {
            key: cache_key(&state),
            category: state.category.clone(),
            sources: state.settings.news_sources.clone(),
            query: state.search_query.clone(),
            page: state.page,
            page_size: state.settings.articles_per_page,
        }
    }

    // ========================================================================
    // Auto-Refresh Timer
    // ========================================================================

    /// Tear down and rebuild the auto-refresh timer from current settings.
    ///
    /// The task holds only a weak reference, so a dropped session ends its
    /// timer instead of being kept alive by it.
    fn apply_refresh_timer(&self) {
        let (enabled, interval) = {
            let state = self.lock_state();
            (
                state.settings.auto_refresh,
                state.settings.refresh_interval(),
            )
        };

        let mut slot = self
            .inner
            .refresh_task
            .lock()
            .expect("refresh task lock poisoned");
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        if !enabled || interval.is_zero() {
            return;
        }

        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; the first refresh should
            // happen one full interval from now.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let session = NewsSession { inner };
                tracing::debug!("Auto-refresh tick");
                if let Err(error) = session.refresh().await {
                    tracing::warn!(error = %error, "Auto-refresh failed");
                }
            }
        }));
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().expect("session state lock poisoned")
    }

    fn lock_coordinator(&self) -> MutexGuard<'_, RequestCoordinator> {
        self.inner
            .coordinator
            .lock()
            .expect("coordinator lock poisoned")
    }
}

fn publish_page(state: &mut SessionState, page: Vec<Article>, append: bool) {
    if append {
        state.articles.extend(page);
    } else {
        state.articles = page;
    }
}

fn cache_key(state: &SessionState) -> CacheKey {
    CacheKey::new(
        &state.category,
        &state.settings.news_sources,
        &state.settings.language,
        &state.settings.content_language,
    )
}

fn sorted_ids(set: &HashSet<String>) -> Vec<String> {
    let mut ids: Vec<String> = set.iter().cloned().collect();
    ids.sort();
    ids
}

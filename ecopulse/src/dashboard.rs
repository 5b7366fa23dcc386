//! Dashboard state and the actions a front end triggers on it.
//!
//! The dashboard owns the session's rate limiter. User-initiated requests
//! (news loads and insight reports) pass through it; the periodic market
//! index refresh does not.

use crate::clock::{Clock, SystemClock};
use crate::rate_limiter::RateLimiter;
use crate::service::NewsService;
use crate::traits::RemoteQuery;
use crate::types::{MarketIndex, NewsArticle, NewsCategory, Region};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub const MISSING_KEY_MESSAGE: &str = "Security error: API key is missing.";
pub const NEWS_FAILED_MESSAGE: &str = "Could not load news. Please try again.";
pub const INSIGHT_FAILED_MESSAGE: &str = "Analysis was interrupted. Please try again.";

pub fn rate_limit_message(seconds: u64) -> String {
    format!("Request throttled. Try again in {}s.", seconds)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardError {
    pub message: String,
    pub is_rate_limit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InsightPanel {
    pub is_open: bool,
    pub topic: String,
    pub content: String,
    pub loading: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    pub news: Vec<NewsArticle>,
    pub indices: Vec<MarketIndex>,
    pub loading: bool,
    pub indices_loading: bool,
    pub error: Option<DashboardError>,
    pub region: Region,
    pub active_sector: NewsCategory,
    pub insight: InsightPanel,
}

impl Default for DashboardState {
    fn default() -> Self {
        // Both panels show a loading state until the first fetch lands.
        Self {
            news: Vec::new(),
            indices: Vec::new(),
            loading: true,
            indices_loading: true,
            error: None,
            region: Region::default(),
            active_sector: NewsCategory::default(),
            insight: InsightPanel::default(),
        }
    }
}

/// What a news load did. The same information is reflected in the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    RateLimited { seconds: u64 },
    MissingCredentials,
    Failed,
}

pub struct Dashboard<Q: RemoteQuery, C: Clock = SystemClock> {
    service: Arc<NewsService<Q>>,
    limiter: Arc<RateLimiter<C>>,
    state: Arc<RwLock<DashboardState>>,
}

impl<Q: RemoteQuery, C: Clock> Clone for Dashboard<Q, C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            limiter: self.limiter.clone(),
            state: self.state.clone(),
        }
    }
}

impl<Q: RemoteQuery> Dashboard<Q, SystemClock> {
    pub fn new(service: NewsService<Q>) -> Self {
        Self::with_limiter(Arc::new(service), Arc::new(RateLimiter::new()))
    }
}

impl<Q: RemoteQuery, C: Clock> Dashboard<Q, C> {
    pub fn with_limiter(service: Arc<NewsService<Q>>, limiter: Arc<RateLimiter<C>>) -> Self {
        Self {
            service,
            limiter,
            state: Arc::new(RwLock::new(DashboardState::default())),
        }
    }

    pub fn service(&self) -> &NewsService<Q> {
        &self.service
    }

    pub fn limiter(&self) -> &RateLimiter<C> {
        &self.limiter
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    /// Changing the region does not reload; call [`load_news`](Self::load_news).
    pub async fn set_region(&self, region: Region) {
        self.state.write().await.region = region;
    }

    pub async fn set_sector(&self, sector: NewsCategory) {
        self.state.write().await.active_sector = sector;
    }

    /// Load news for the current region and sector, optionally narrowed by
    /// a free-text query.
    pub async fn load_news(&self, query: Option<&str>) -> LoadOutcome {
        if !self.service.is_configured() {
            let mut state = self.state.write().await;
            state.error = Some(DashboardError {
                message: MISSING_KEY_MESSAGE.to_string(),
                is_rate_limit: false,
            });
            state.loading = false;
            return LoadOutcome::MissingCredentials;
        }

        if !self.limiter.can_request() {
            let seconds = self.limiter.time_remaining();
            debug!("News load throttled for {}s", seconds);
            self.state.write().await.error = Some(DashboardError {
                message: rate_limit_message(seconds),
                is_rate_limit: true,
            });
            return LoadOutcome::RateLimited { seconds };
        }

        let (region, sector) = {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
            (state.region, state.active_sector)
        };

        let result = self.service.fetch_economic_news(region, sector, query).await;

        let mut state = self.state.write().await;
        state.loading = false;
        match result {
            Ok(feed) => {
                info!("Loaded {} articles ({}, {})", feed.articles.len(), region, sector);
                let count = feed.articles.len();
                state.news = feed.articles;
                LoadOutcome::Loaded(count)
            }
            Err(e) => {
                error!("News load failed: {}", e);
                state.error = Some(DashboardError {
                    message: NEWS_FAILED_MESSAGE.to_string(),
                    is_rate_limit: false,
                });
                LoadOutcome::Failed
            }
        }
    }

    /// Refresh the index ticker. Failures are logged and the previous
    /// values stay on screen.
    pub async fn load_market_data(&self) -> bool {
        self.state.write().await.indices_loading = true;

        let result = self.service.fetch_market_indices().await;

        let mut state = self.state.write().await;
        state.indices_loading = false;
        match result {
            Ok(indices) => {
                state.indices = indices;
                true
            }
            Err(e) => {
                error!("Market data fetch failed: {}", e);
                false
            }
        }
    }

    /// Reload news and indices together.
    pub async fn refresh_all(&self) -> (LoadOutcome, bool) {
        tokio::join!(self.load_news(None), self.load_market_data())
    }

    pub async fn show_insight(&self, topic: &str) {
        {
            let mut state = self.state.write().await;
            state.insight = InsightPanel {
                is_open: true,
                topic: topic.to_string(),
                content: String::new(),
                loading: true,
            };
        }

        let content = if !self.limiter.can_request() {
            rate_limit_message(self.limiter.time_remaining())
        } else {
            match self.service.get_deep_insight(topic).await {
                Ok(insight) => insight,
                Err(e) => {
                    error!("Insight request failed: {}", e);
                    INSIGHT_FAILED_MESSAGE.to_string()
                }
            }
        };

        let mut state = self.state.write().await;
        // The panel may have been closed or reopened on another topic meanwhile.
        if state.insight.is_open && state.insight.topic == topic {
            state.insight.content = content;
            state.insight.loading = false;
        }
    }

    pub async fn close_insight(&self) {
        self.state.write().await.insight = InsightPanel::default();
    }
}

impl<Q, C> Dashboard<Q, C>
where
    Q: RemoteQuery + 'static,
    C: Clock + 'static,
{
    /// Refresh market indices every `every`, starting one period from now.
    pub fn spawn_index_refresh(&self, every: Duration) -> IndexRefreshHandle {
        let dashboard = self.clone();
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            // `interval` panics on a zero period.
            let mut ticker = interval(every.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => break,
                }

                debug!("Periodic market index refresh");
                dashboard.load_market_data().await;

                if *stop_rx.borrow() {
                    break;
                }
            }
            debug!("Market index refresh stopped");
        });

        IndexRefreshHandle { stop_tx, task }
    }
}

/// Stops the periodic refresh when [`stop`](Self::stop)ped or dropped.
/// A refresh already in flight runs to completion.
pub struct IndexRefreshHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl IndexRefreshHandle {
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Index refresh task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

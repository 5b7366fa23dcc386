use crate::sanitizer::SanitizedText;
use crate::traits::RemoteQuery;
use crate::types::{ArticleDraft, GroundingSource, MarketIndex, NewsResponse, PulseError, Result, Sentiment, Trend};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Scripted backend for development and testing.
///
/// Failures queued with [`fail_next`](Self::fail_next) are consumed one per
/// call, across all three operations, before canned data is returned.
pub struct MockRemoteQuery {
    name: String,
    response_delay_ms: u64,
    configured: bool,
    indices: Vec<MarketIndex>,
    articles: Vec<ArticleDraft>,
    sources: Vec<GroundingSource>,
    insight: String,
    failures: Mutex<VecDeque<Option<u16>>>,
    searches: Mutex<Vec<String>>,
    index_calls: AtomicUsize,
    news_calls: AtomicUsize,
    insight_calls: AtomicUsize,
}

impl MockRemoteQuery {
    pub fn new(name: String) -> Self {
        Self {
            name,
            response_delay_ms: 0,
            configured: true,
            indices: Vec::new(),
            articles: Vec::new(),
            sources: Vec::new(),
            insight: String::new(),
            failures: Mutex::new(VecDeque::new()),
            searches: Mutex::new(Vec::new()),
            index_calls: AtomicUsize::new(0),
            news_calls: AtomicUsize::new(0),
            insight_calls: AtomicUsize::new(0),
        }
    }

    /// Canned market snapshot used by `ecopulse --offline`.
    pub fn sample() -> Self {
        let quote = |name: &str, value: &str, change: &str, percent: &str, trend: Trend| MarketIndex {
            name: name.to_string(),
            value: value.to_string(),
            change: change.to_string(),
            change_percent: percent.to_string(),
            trend,
        };

        Self::new("offline".to_string())
            .with_indices(vec![
                quote("KOSPI", "2,650.31", "+12.40", "+0.47%", Trend::Up),
                quote("KOSDAQ", "868.12", "-3.05", "-0.35%", Trend::Down),
                quote("S&P 500", "5,431.60", "+4.87", "+0.09%", Trend::Up),
                quote("NASDAQ", "17,688.88", "-12.35", "-0.07%", Trend::Down),
                quote("USD/KRW", "1,381.50", "0.00", "0.00%", Trend::Neutral),
            ])
            .with_articles(vec![ArticleDraft {
                id: "offline-1".to_string(),
                title: "Bank of Korea holds base rate".to_string(),
                summary: "The central bank kept its policy rate unchanged, citing household debt.".to_string(),
                source: "Offline sample".to_string(),
                sentiment: Sentiment::Neutral,
                reliability_score: 0.9,
            }])
            .with_insight("Offline mode: no live insight is available.".to_string())
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    pub fn with_indices(mut self, indices: Vec<MarketIndex>) -> Self {
        self.indices = indices;
        self
    }

    pub fn with_articles(mut self, articles: Vec<ArticleDraft>) -> Self {
        self.articles = articles;
        self
    }

    pub fn with_sources(mut self, sources: Vec<GroundingSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_insight(mut self, insight: String) -> Self {
        self.insight = insight;
        self
    }

    /// Report missing credentials from [`RemoteQuery::is_configured`].
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Fail the next `count` calls. `status: None` simulates a failure
    /// without a status code (a dropped connection, say).
    pub fn fail_next(&self, count: usize, status: Option<u16>) {
        let mut failures = self.failures.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        failures.extend(std::iter::repeat(status).take(count));
    }

    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }

    pub fn news_calls(&self) -> usize {
        self.news_calls.load(Ordering::SeqCst)
    }

    pub fn insight_calls(&self) -> usize {
        self.insight_calls.load(Ordering::SeqCst)
    }

    /// Search strings received by `economic_news`, oldest first.
    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    async fn simulate_call(&self) -> Result<()> {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.response_delay_ms)).await;
        }

        let failure = self.failures.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).pop_front();
        match failure {
            None => Ok(()),
            Some(Some(status)) => Err(PulseError::Status {
                status,
                body: format!("scripted failure from {}", self.name),
            }),
            Some(None) => Err(PulseError::General(format!("scripted connection failure from {}", self.name))),
        }
    }
}

#[async_trait]
impl RemoteQuery for MockRemoteQuery {
    fn backend_name(&self) -> String {
        format!("Mock backend ({})", self.name)
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn market_indices(&self) -> Result<Vec<MarketIndex>> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;
        Ok(self.indices.clone())
    }

    async fn economic_news(&self, search: &str) -> Result<NewsResponse> {
        self.news_calls.fetch_add(1, Ordering::SeqCst);
        self.searches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(search.to_string());
        self.simulate_call().await?;

        debug!("Mock news for: {}", search);
        Ok(NewsResponse {
            articles: self.articles.clone(),
            sources: self.sources.clone(),
        })
    }

    async fn deep_insight(&self, topic: &SanitizedText) -> Result<String> {
        self.insight_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;

        if self.insight.is_empty() {
            Ok(format!("Insight on {}", topic))
        } else {
            Ok(self.insight.clone())
        }
    }
}

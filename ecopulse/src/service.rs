use crate::retry::RetryPolicy;
use crate::sanitizer::{sanitize, SanitizedText};
use crate::traits::RemoteQuery;
use crate::types::{MarketIndex, NewsArticle, NewsCategory, NewsFeed, NewsResponse, Region, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

const FALLBACK_ARTICLE_URL: &str = "#";

/// Runs each dashboard query through sanitization and the retry policy
/// before handing it to the backend.
pub struct NewsService<Q: RemoteQuery> {
    backend: Q,
    retry: RetryPolicy,
}

impl<Q: RemoteQuery> NewsService<Q> {
    pub fn new(backend: Q) -> Self {
        Self {
            backend,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn backend(&self) -> &Q {
        &self.backend
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_configured()
    }

    pub async fn fetch_market_indices(&self) -> Result<Vec<MarketIndex>> {
        debug!("Fetching market indices from {}", self.backend.backend_name());
        self.retry.run(|| self.backend.market_indices()).await
    }

    /// News for `region` and `category`, or a free-text search within the
    /// region when `query` has anything left after sanitizing.
    pub async fn fetch_economic_news(
        &self,
        region: Region,
        category: NewsCategory,
        query: Option<&str>,
    ) -> Result<NewsFeed> {
        let clean_query = sanitize(query);
        let search = build_search_query(region, category, &clean_query);
        info!("Fetching news: {}", search);

        let response = self.retry.run(|| self.backend.economic_news(&search)).await?;
        Ok(assemble_feed(response, category, Utc::now()))
    }

    pub async fn get_deep_insight(&self, topic: &str) -> Result<String> {
        let topic = sanitize(topic);
        info!("Requesting insight on: {}", topic);
        self.retry.run(|| self.backend.deep_insight(&topic)).await
    }
}

pub fn build_search_query(region: Region, category: NewsCategory, query: &SanitizedText) -> String {
    if query.is_empty() {
        format!("Latest important {} news in {}", category, region.label())
    } else {
        format!("{} market news about {}", region.label(), query)
    }
}

/// Stamp model drafts with the fetch time, the requested category, and the
/// URL of the grounding source at the same position.
pub fn assemble_feed(response: NewsResponse, category: NewsCategory, fetched_at: DateTime<Utc>) -> NewsFeed {
    let NewsResponse { articles, sources } = response;

    let articles = articles
        .into_iter()
        .enumerate()
        .map(|(index, draft)| NewsArticle {
            url: sources
                .get(index)
                .map(|source| source.uri.clone())
                .filter(|uri| !uri.is_empty())
                .unwrap_or_else(|| FALLBACK_ARTICLE_URL.to_string()),
            id: draft.id,
            title: draft.title,
            summary: draft.summary,
            source: draft.source,
            published_at: fetched_at,
            category,
            sentiment: draft.sentiment,
            reliability_score: draft.reliability_score,
        })
        .collect();

    NewsFeed { articles, sources }
}

use crate::sanitizer::SanitizedText;
use crate::types::{MarketIndex, NewsResponse, Result};
use async_trait::async_trait;

/// A backend that answers the dashboard's three kinds of questions.
///
/// Implementations perform one attempt per call; retrying is the caller's
/// job (see [`NewsService`](crate::NewsService)).
#[async_trait]
pub trait RemoteQuery: Send + Sync {
    /// Human-readable name for this backend
    fn backend_name(&self) -> String;

    /// Whether the backend has the credentials it needs to make calls.
    fn is_configured(&self) -> bool {
        true
    }

    /// Latest values of the tracked market indices.
    async fn market_indices(&self) -> Result<Vec<MarketIndex>>;

    /// Recent news matching `search`, which is already sanitized and
    /// phrased as a search query.
    async fn economic_news(&self, search: &str) -> Result<NewsResponse>;

    /// Free-text market insight report on `topic`.
    async fn deep_insight(&self, topic: &SanitizedText) -> Result<String>;
}

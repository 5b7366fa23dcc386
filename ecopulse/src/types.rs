use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub use interfaces::defs::{GroundingSource, MarketIndex, NewsArticle, NewsCategory, NewsFeed, Region, Sentiment, Trend};

use crate::retry::RemoteFailure;

pub const API_KEY_VAR: &str = "API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
pub const DEFAULT_NEWS_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_INSIGHT_MODEL: &str = "gemini-3-pro-preview";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub news_model: String,
    pub insight_model: String,
    pub response_language: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub rate_limit_interval_ms: u64,
    pub index_refresh_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            news_model: DEFAULT_NEWS_MODEL.to_string(),
            insight_model: DEFAULT_INSIGHT_MODEL.to_string(),
            response_language: "Korean".to_string(),
            user_agent: "EcoPulse/1.0".to_string(),
            timeout_seconds: 60,
            max_retries: 3,
            retry_delay_ms: 1000,
            rate_limit_interval_ms: 5000,
            index_refresh_seconds: 600,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with whatever the environment provides.
    ///
    /// A missing `API_KEY` is not an error here; the dashboard reports it
    /// when a request is attempted.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env::var(API_KEY_VAR).unwrap_or_default(),
            base_url: env::var("ECOPULSE_BASE_URL").unwrap_or(defaults.base_url),
            news_model: env::var("ECOPULSE_NEWS_MODEL").unwrap_or(defaults.news_model),
            insight_model: env::var("ECOPULSE_INSIGHT_MODEL").unwrap_or(defaults.insight_model),
            response_language: env::var("ECOPULSE_LANGUAGE").unwrap_or(defaults.response_language),
            ..defaults
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn rate_limit_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit_interval_ms)
    }

    pub fn index_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.index_refresh_seconds)
    }
}

/// Article as the model returns it, before the service stamps it with a
/// URL, category and fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDraft {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub reliability_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsResponse {
    pub articles: Vec<ArticleDraft>,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote call failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Rate limited for {seconds} seconds")]
    RateLimited { seconds: u64 },

    #[error("Missing API key: set {var}")]
    MissingApiKey { var: String },

    #[error("General error: {0}")]
    General(String),
}

impl RemoteFailure for PulseError {
    fn status(&self) -> Option<u16> {
        match self {
            PulseError::Http(e) => e.status().map(|s| s.as_u16()),
            PulseError::Status { status, .. } => Some(*status),
            PulseError::RateLimited { .. } => Some(429),
            PulseError::MissingApiKey { .. } => Some(401),
            PulseError::InvalidUrl(_) => Some(400),
            PulseError::Parse(_) | PulseError::Serialization(_) | PulseError::General(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PulseError>;

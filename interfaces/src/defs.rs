use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a category or region name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseDefError {
    pub kind: &'static str,
    pub value: String,
}

/// News sectors the dashboard can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewsCategory {
    #[default]
    All,
    Korea,
    Business,
    Stock,
    Crypto,
    Tech,
    Entertainment,
    Health,
}

impl NewsCategory {
    pub const ALL_SECTORS: [NewsCategory; 8] = [
        NewsCategory::All,
        NewsCategory::Korea,
        NewsCategory::Business,
        NewsCategory::Stock,
        NewsCategory::Crypto,
        NewsCategory::Tech,
        NewsCategory::Entertainment,
        NewsCategory::Health,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::All => "ALL",
            NewsCategory::Korea => "KOREA",
            NewsCategory::Business => "BUSINESS",
            NewsCategory::Stock => "STOCK",
            NewsCategory::Crypto => "CRYPTO",
            NewsCategory::Tech => "TECH",
            NewsCategory::Entertainment => "ENTERTAINMENT",
            NewsCategory::Health => "HEALTH",
        }
    }
}

impl fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NewsCategory {
    type Err = ParseDefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NewsCategory::ALL_SECTORS
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseDefError { kind: "category", value: s.to_string() })
    }
}

/// Which market the news feed is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Domestic,
    Overseas,
}

impl Region {
    /// The market name used inside search queries.
    pub fn label(&self) -> &'static str {
        match self {
            Region::Domestic => "South Korea",
            Region::Overseas => "Global/US",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Domestic => f.write_str("domestic"),
            Region::Overseas => f.write_str("overseas"),
        }
    }
}

impl FromStr for Region {
    type Err = ParseDefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "domestic" => Ok(Region::Domestic),
            "overseas" => Ok(Region::Overseas),
            _ => Err(ParseDefError { kind: "region", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub category: NewsCategory,
    pub sentiment: Sentiment,
    pub reliability_score: f64,
}

/// A market index quote. Values are kept as text because the search
/// backend reports them in whatever format the source page uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketIndex {
    pub name: String,
    pub value: String,
    pub change: String,
    pub change_percent: String,
    pub trend: Trend,
}

/// A web page the search backend grounded its answer on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsFeed {
    pub articles: Vec<NewsArticle>,
    pub sources: Vec<GroundingSource>,
}

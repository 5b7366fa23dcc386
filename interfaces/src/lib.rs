pub mod defs;

pub use defs::{
    GroundingSource, MarketIndex, NewsArticle, NewsCategory, NewsFeed, ParseDefError, Region,
    Sentiment, Trend,
};

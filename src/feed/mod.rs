//! RSS feed fetching and parsing
pub mod client;
pub mod error;
pub mod parse;

pub use client::GoogleRssClient;
pub use error::FeedError;
pub use parse::{clean_description, parse_rss};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One article entry from a feed, shaped the way the portal expects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RssItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Source of RSS items for a fully built search URL
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<RssItem>, FeedError>;
}

use super::{FeedClient, FeedError, RssItem, parse::parse_rss};
use crate::config::GoogleRssConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// HTTP client for Google News RSS search feeds
pub struct GoogleRssClient {
    http_client: Client,
}

impl GoogleRssClient {
    pub fn new(config: &GoogleRssConfig) -> Result<Self, FeedError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl FeedClient for GoogleRssClient {
    async fn fetch(&self, url: &str) -> Result<Vec<RssItem>, FeedError> {
        debug!("Fetching RSS feed: {}", url);

        let response = self.http_client.get(url).send().await.map_err(|e| {
            error!("RSS request error: {}", e);
            FeedError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("RSS request failed with status {}", status.as_u16());
            return Err(FeedError::Status(status.as_u16()));
        }

        let xml = response.text().await?;
        let items = parse_rss(&xml)?;
        debug!("Parsed {} RSS items", items.len());
        Ok(items)
    }
}

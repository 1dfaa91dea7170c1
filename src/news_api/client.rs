use super::{NewsApiClient, NewsApiError, NewsApiPayload, NewsApiQuery, NewsApiResponse};
use crate::config::NewsApiConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// HTTP client for the News API `everything` endpoint
pub struct HttpNewsApiClient {
    http_client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpNewsApiClient {
    pub fn new(config: &NewsApiConfig) -> Result<Self, NewsApiError> {
        let invalid = |message: String| NewsApiError::InvalidBaseUrl {
            url: config.base_url.clone(),
            message,
        };
        let base_url = Url::parse(&config.base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path".to_string()));
        }

        let http_client =
            Client::builder().timeout(Duration::from_secs(config.timeout_seconds)).build()?;

        Ok(Self {
            http_client,
            base_url,
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        })
    }

    /// Search URL for `query`; the key is only added for the actual request.
    pub fn search_url(&self, query: &NewsApiQuery, api_key: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL always accepts path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("everything");
        }
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", &query.keyword)
                .append_pair("from", &query.start_date.format("%Y-%m-%d").to_string())
                .append_pair("to", &query.end_date.format("%Y-%m-%d").to_string())
                .append_pair("pageSize", &query.page_size.to_string())
                .append_pair("language", "en");
            if let Some(key) = api_key {
                pairs.append_pair("apiKey", key);
            }
        }
        url
    }
}

#[async_trait]
impl NewsApiClient for HttpNewsApiClient {
    async fn everything(&self, query: &NewsApiQuery) -> Result<NewsApiResponse, NewsApiError> {
        let api_key = self.api_key.as_deref().ok_or(NewsApiError::MissingApiKey)?;
        let request_url = self.search_url(query, None).to_string();
        info!("Requesting News API: {}", request_url);

        let response =
            self.http_client.get(self.search_url(query, Some(api_key))).send().await.map_err(|e| {
                // The URL carries the API key
                let e = e.without_url();
                error!("News API request failed: {}", e);
                NewsApiError::Http(e)
            })?;

        let http_status = response.status().as_u16();
        let text = response.text().await.map_err(|e| NewsApiError::Http(e.without_url()))?;
        let payload: NewsApiPayload = serde_json::from_str(&text).map_err(|e| {
            error!("News API answered {} with a non-JSON body", http_status);
            NewsApiError::InvalidBody { status: http_status, message: e.to_string() }
        })?;

        debug!(
            "News API answered {} with {} articles",
            http_status,
            payload.articles.as_ref().map_or(0, Vec::len)
        );
        Ok(NewsApiResponse { http_status, request_url, payload })
    }
}

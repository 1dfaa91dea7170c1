use super::{DeduperClient, DeduperError, UpstreamResponse};
use crate::config::DeduperConfig;
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

pub struct HttpDeduperClient {
    http_client: Client,
    base_url: Url,
}

impl HttpDeduperClient {
    pub fn new(config: &DeduperConfig) -> Result<Self, DeduperError> {
        let invalid = |message: String| DeduperError::InvalidBaseUrl {
            url: config.base_url.clone(),
            message,
        };
        let base_url = Url::parse(&config.base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path".to_string()));
        }

        let http_client =
            Client::builder().timeout(Duration::from_secs(config.timeout_seconds)).build()?;

        Ok(Self { http_client, base_url })
    }

    /// Append `segments` to the base path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL always accepts path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, method: Method, segments: &[&str]) -> Result<UpstreamResponse, DeduperError> {
        let url = self.endpoint(segments);
        debug!("Deduper {} {}", method, url);

        let response = self.http_client.request(method, url.clone()).send().await.map_err(|e| {
            error!("Deduper request to {} failed: {}", url, e);
            DeduperError::Http(e)
        })?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).map_err(|e| {
            error!("Deduper answered {} with a non-JSON body", status);
            DeduperError::InvalidBody { status, message: e.to_string() }
        })?;

        Ok(UpstreamResponse::new(status, body))
    }
}

#[async_trait]
impl DeduperClient for HttpDeduperClient {
    async fn request_job(&self, report_id: i64) -> Result<UpstreamResponse, DeduperError> {
        let report_id = report_id.to_string();
        self.send(Method::GET, &["deduper", "jobs", "reportId", &report_id]).await
    }

    async fn list_jobs(&self) -> Result<UpstreamResponse, DeduperError> {
        self.send(Method::GET, &["deduper", "jobs", "list"]).await
    }

    async fn job_status(&self, job_id: &str) -> Result<UpstreamResponse, DeduperError> {
        self.send(Method::GET, &["deduper", "jobs", job_id]).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<UpstreamResponse, DeduperError> {
        self.send(Method::POST, &["deduper", "jobs", job_id, "cancel"]).await
    }

    async fn clear_table(&self) -> Result<UpstreamResponse, DeduperError> {
        self.send(Method::DELETE, &["deduper", "clear-db-table"]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> HttpDeduperClient {
        HttpDeduperClient::new(&DeduperConfig { base_url: base_url.to_string(), timeout_seconds: 5 })
            .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = client("http://queuer:8000/");
        assert_eq!(
            client.endpoint(&["deduper", "jobs", "list"]).as_str(),
            "http://queuer:8000/deduper/jobs/list"
        );
    }

    #[test]
    fn test_base_url_path_prefix_is_kept() {
        let client = client("http://gateway/queuer");
        assert_eq!(
            client.endpoint(&["deduper", "jobs", "7"]).as_str(),
            "http://gateway/queuer/deduper/jobs/7"
        );
    }

    #[test]
    fn test_job_id_is_percent_encoded_as_path_segment() {
        let client = client("http://queuer:8000");
        assert_eq!(
            client.endpoint(&["deduper", "jobs", "a/b c+d", "cancel"]).as_str(),
            "http://queuer:8000/deduper/jobs/a%2Fb%20c+d/cancel"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = DeduperConfig { base_url: "not a url".to_string(), timeout_seconds: 5 };
        assert!(matches!(
            HttpDeduperClient::new(&config),
            Err(DeduperError::InvalidBaseUrl { .. })
        ));
    }
}

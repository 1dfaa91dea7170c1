//! Batch Google News RSS requests driven by a spreadsheet of saved queries.
//!
//! Each row is turned into a search URL, fetched, and stored. Rows whose
//! URL was already requested today are skipped so a rerun on the same day
//! does not hammer the feed; a 503 from Google stops the run because
//! every following request would be rate limited too.

use crate::config::{AutomationConfig, DEFAULT_REQUEST_DELAY_MS};
use crate::database::{NewsRepository, RepositoryError, models::RequestStatus};
use crate::feed::FeedClient;
use crate::ingest::{self, StoreRequest};
use crate::query::{RssLocale, build_query};
use crate::spreadsheet::{self, SpreadsheetError};
use serde::Serialize;
use std::{path::Path, sync::Arc, time::Duration};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Failed to read query file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(
        "HTTP 503 Service Unavailable (id: {row_id}): {url}. Google RSS rate limit likely exceeded. \
         Try increasing automation.request_delay_ms (current: {delay_ms}ms)."
    )]
    RateLimited { row_id: i64, url: String, delay_ms: u128 },
}

pub use crate::spreadsheet::QueryRow;

/// Read the query rows of the XLSX workbook at `path`.
pub async fn load_query_rows(path: &Path) -> Result<Vec<QueryRow>, AutomationError> {
    let bytes = tokio::fs::read(path).await?;
    let rows = spreadsheet::read_query_rows(bytes)?;
    info!("Loaded {} query rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Delay between requests, falling back to the default when out of range.
pub fn resolve_request_delay(config: &AutomationConfig) -> Duration {
    match config.checked_delay_ms() {
        Ok(ms) => Duration::from_millis(ms),
        Err(e) => {
            error!("{}; using {}ms", e, DEFAULT_REQUEST_DELAY_MS);
            Duration::from_millis(DEFAULT_REQUEST_DELAY_MS)
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSummary {
    pub requested: usize,
    pub failed: usize,
    pub skipped_empty: usize,
    pub skipped_already_requested: usize,
    pub articles_saved: usize,
    pub cancelled: bool,
}

pub struct RssAutomation {
    repo: Arc<dyn NewsRepository>,
    feed: Arc<dyn FeedClient>,
    locale: RssLocale,
    delay: Duration,
}

impl RssAutomation {
    pub fn new(repo: Arc<dyn NewsRepository>, feed: Arc<dyn FeedClient>, locale: RssLocale) -> Self {
        Self { repo, feed, locale, delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn run(
        &self,
        rows: &[QueryRow],
        cancel: &CancellationToken,
    ) -> Result<AutomationSummary, AutomationError> {
        info!("Delay between requests: {}ms", self.delay.as_millis());

        let source = ingest::ensure_google_rss_source(self.repo.as_ref()).await?;
        let mut summary = AutomationSummary::default();
        let today = ingest::today();

        for (index, row) in rows.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Automation cancelled before row {}", row.id);
                summary.cancelled = true;
                break;
            }

            if row.request.has_no_terms() {
                warn!("Skipping row {}: empty query", row.id);
                summary.skipped_empty += 1;
                continue;
            }

            let query = build_query(&row.request);
            let url = self.locale.search_url(&query.query);

            if self.repo.request_made_on(&url, today).await? {
                info!("Skipping RSS request (id: {}): already requested today: {}", row.id, url);
                summary.skipped_already_requested += 1;
                continue;
            }

            let note = if query.time_range_invalid { " - invalid time_range" } else { "" };
            info!("Requesting RSS (id: {}, {}{}): {}", row.id, query.time_range, note, url);

            let (status, items) = match self.feed.fetch(&url).await {
                Ok(items) => (RequestStatus::Success, items),
                Err(e) if e.is_rate_limited() => {
                    let err = AutomationError::RateLimited {
                        row_id: row.id,
                        url,
                        delay_ms: self.delay.as_millis(),
                    };
                    error!("{}", err);
                    return Err(err);
                },
                Err(e) => {
                    error!("RSS request failed (id: {}): {}", row.id, e);
                    summary.failed += 1;
                    (RequestStatus::Error, Vec::new())
                },
            };

            let outcome = ingest::store_request_and_articles(
                self.repo.as_ref(),
                StoreRequest {
                    request_url: &url,
                    and_string: non_empty(query.and_string),
                    or_string: non_empty(query.or_string),
                    status,
                    items: &items,
                    source,
                    is_from_automation: true,
                },
            )
            .await?;

            summary.requested += 1;
            summary.articles_saved += outcome.articles_saved;

            if index + 1 < rows.len() {
                tokio::select! {
                    _ = cancel.cancelled() => {},
                    _ = tokio::time::sleep(self.delay) => {},
                }
            }
        }

        info!(
            "Automation finished: {} requested, {} failed, {} articles saved",
            summary.requested, summary.failed, summary.articles_saved
        );
        Ok(summary)
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryNewsRepository;
    use crate::feed::{FeedError, RssItem};
    use crate::query::QueryRequest;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::io::Write;

    /// Serves canned results in order and records requested URLs
    struct ScriptedFeed {
        responses: Mutex<Vec<Result<Vec<RssItem>, FeedError>>>,
        requested: Mutex<Vec<String>>,
    }

    impl ScriptedFeed {
        fn new(mut responses: Vec<Result<Vec<RssItem>, FeedError>>) -> Self {
            responses.reverse();
            Self { responses: Mutex::new(responses), requested: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl FeedClient for ScriptedFeed {
        async fn fetch(&self, url: &str) -> Result<Vec<RssItem>, FeedError> {
            self.requested.lock().push(url.to_string());
            self.responses.lock().pop().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn row(id: i64, and_keywords: &str) -> QueryRow {
        QueryRow {
            id,
            request: QueryRequest {
                and_keywords: Some(and_keywords.to_string()),
                time_range: Some("7d".to_string()),
                ..Default::default()
            },
        }
    }

    fn article(link: &str) -> RssItem {
        RssItem {
            title: Some("Recall".to_string()),
            description: "Recall".to_string(),
            link: Some(link.to_string()),
            ..Default::default()
        }
    }

    fn automation(repo: &Arc<InMemoryNewsRepository>, feed: &Arc<ScriptedFeed>) -> RssAutomation {
        RssAutomation::new(repo.clone(), feed.clone(), RssLocale::default())
            .with_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_run_stores_articles_and_skips_repeats() {
        let repo = Arc::new(InMemoryNewsRepository::new());
        let feed = Arc::new(ScriptedFeed::new(vec![
            Ok(vec![article("https://a.example/1"), article("https://a.example/2")]),
            Err(FeedError::Status(500)),
        ]));

        let rows = vec![row(1, "recall"), row(2, " , "), row(3, "recall"), row(4, "hazard")];
        let summary =
            automation(&repo, &feed).run(&rows, &CancellationToken::new()).await.unwrap();

        assert_eq!(summary.requested, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped_empty, 1);
        assert_eq!(summary.skipped_already_requested, 1);
        assert_eq!(summary.articles_saved, 2);
        assert_eq!(feed.requested.lock().len(), 2);

        repo.with_data(|data| {
            assert_eq!(data.requests.len(), 2);
            assert!(data.requests.iter().all(|r| r.request.is_from_automation));
            assert_eq!(data.requests[1].request.status, RequestStatus::Error);
        });
    }

    #[tokio::test]
    async fn test_rate_limit_aborts_run() {
        let repo = Arc::new(InMemoryNewsRepository::new());
        let feed = Arc::new(ScriptedFeed::new(vec![Err(FeedError::Status(503))]));

        let rows = vec![row(7, "recall"), row(8, "hazard")];
        let err = automation(&repo, &feed).run(&rows, &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, AutomationError::RateLimited { row_id: 7, .. }));
        assert_eq!(feed.requested.lock().len(), 1);
        repo.with_data(|data| assert!(data.requests.is_empty()));
    }

    #[tokio::test]
    async fn test_cancelled_run_makes_no_requests() {
        let repo = Arc::new(InMemoryNewsRepository::new());
        let feed = Arc::new(ScriptedFeed::new(vec![]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = automation(&repo, &feed).run(&[row(1, "recall")], &cancel).await.unwrap();
        assert!(summary.cancelled);
        assert!(feed.requested.lock().is_empty());
    }

    #[tokio::test]
    async fn test_load_query_rows_rejects_non_spreadsheets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": 1, "and_keywords": "recall"}}]"#).unwrap();

        let err = load_query_rows(file.path()).await.unwrap_err();
        assert!(matches!(err, AutomationError::Spreadsheet(SpreadsheetError::Workbook(_))));

        let missing = file.path().with_extension("missing.xlsx");
        assert!(matches!(load_query_rows(&missing).await, Err(AutomationError::Io(_))));
    }

    #[test]
    fn test_resolve_request_delay_falls_back() {
        let delay =
            resolve_request_delay(&AutomationConfig { request_delay_ms: 50, ..Default::default() });
        assert_eq!(delay, Duration::from_millis(DEFAULT_REQUEST_DELAY_MS));

        let delay =
            resolve_request_delay(&AutomationConfig { request_delay_ms: 750, ..Default::default() });
        assert_eq!(delay, Duration::from_millis(750));
    }
}

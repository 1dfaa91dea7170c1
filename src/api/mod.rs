//! HTTP surface of the service
pub mod articles;
pub mod automations;
pub mod deduper;
pub mod error;
pub mod google_rss;
pub mod health;
pub mod news_api;
pub mod reports;
pub mod state_assigner;
pub mod states;

pub use error::{ApiError, ApiJson};

use crate::{
    database::NewsRepository, deduper::DeduperClient, excel_files::ExcelFileStore,
    feed::FeedClient, news_api::NewsApiClient, query::RssLocale,
};
use axum::{Router, body::Bytes};
use serde_json::{Value, json};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::oneshot;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// Dependencies shared by every handler
#[derive(Clone)]
pub struct ApiState {
    pub repo: Arc<dyn NewsRepository>,
    pub feed: Arc<dyn FeedClient>,
    pub deduper: Arc<dyn DeduperClient>,
    /// Unset when News API requests are disabled
    pub news_api: Option<Arc<dyn NewsApiClient>>,
    /// Unset when no automation spreadsheet directory is configured
    pub excel_files: Option<ExcelFileStore>,
    pub locale: RssLocale,
    pub service_name: String,
    pub stopping: Arc<AtomicBool>,
}

impl ApiState {
    pub fn new(
        repo: Arc<dyn NewsRepository>,
        feed: Arc<dyn FeedClient>,
        deduper: Arc<dyn DeduperClient>,
        locale: RssLocale,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            feed,
            deduper,
            news_api: None,
            excel_files: None,
            locale,
            service_name: service_name.into(),
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_news_api(mut self, client: Arc<dyn NewsApiClient>) -> Self {
        self.news_api = Some(client);
        self
    }

    pub fn with_excel_files(mut self, store: ExcelFileStore) -> Self {
        self.excel_files = Some(store);
        self
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .merge(health::routes())
        .nest("/articles", articles::routes())
        .nest("/automations", automations::routes())
        .nest("/google-rss", google_rss::routes())
        .nest("/news-api", news_api::routes())
        .nest("/states", states::routes())
        .nest("/reports", reports::routes())
        .nest("/analysis/deduper", deduper::routes())
        .nest("/analysis/state-assigner", state_assigner::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Parse a JSON request body; an empty body reads as `{}`.
pub(crate) fn parse_body(body: &Bytes) -> Result<Value, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| format!("Invalid JSON body: {}", e))
}

/// API server with a two-phase graceful shutdown: health checks fail first, then
/// the listener stops accepting connections.
#[derive(Clone)]
pub struct ApiServer {
    addr: std::net::SocketAddr,
    shutdown_tx: Arc<parking_lot::Mutex<Option<oneshot::Sender<()>>>>,
    pub stopping: Arc<AtomicBool>,
}

impl ApiServer {
    pub fn new(addr: std::net::SocketAddr) -> Self {
        ApiServer {
            addr,
            shutdown_tx: Arc::new(parking_lot::Mutex::new(None)),
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(&self, mut state: ApiState) -> std::io::Result<()> {
        state.stopping = self.stopping.clone();
        let app = router(state);

        let (tx, rx) = oneshot::channel();
        *self.shutdown_tx.lock() = Some(tx);

        info!("Starting API server on {}", self.addr);
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(rx)).await
    }

    pub async fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        info!("API server entering graceful shutdown phase");
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;

        if let Some(tx) = self.shutdown_tx.lock().take() {
            if tx.send(()).is_err() {
                error!("Failed to send shutdown signal to API server");
            }
        }
    }
}

async fn shutdown_signal(rx: oneshot::Receiver<()>) {
    let _ = rx.await;
    info!("API server received shutdown signal");
}

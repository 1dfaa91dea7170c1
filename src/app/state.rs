//! Builds the production dependencies behind `ApiState`
use crate::{
    api::ApiState,
    app::{AppError, Result},
    config::Config,
    database::{Database, PostgresNewsRepository},
    deduper::HttpDeduperClient,
    excel_files::ExcelFileStore,
    feed::GoogleRssClient,
    news_api::HttpNewsApiClient,
};
use std::sync::Arc;
use tracing::{info, warn};

/// State provider that initializes application components
pub struct StateProvider {
    config: Config,
}

impl StateProvider {
    pub fn new(config: &Config) -> Self {
        Self { config: config.clone() }
    }

    /// Connect to the database (running migrations when enabled) and
    /// build the outbound HTTP clients.
    pub async fn provide(&self) -> Result<ApiState> {
        let database = Arc::new(
            Database::new(&self.config.database)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?,
        );
        database.log_connection_info();

        if self.config.database.run_migrations {
            database.migrate().await.map_err(|e| AppError::Database(e.to_string()))?;
        }

        let feed = GoogleRssClient::new(&self.config.google_rss)
            .map_err(|e| AppError::Client(e.to_string()))?;
        let deduper = HttpDeduperClient::new(&self.config.deduper)
            .map_err(|e| AppError::Client(e.to_string()))?;

        let mut state = ApiState::new(
            Arc::new(PostgresNewsRepository::new(database)),
            Arc::new(feed),
            Arc::new(deduper),
            self.config.google_rss.locale(),
            self.config.server.service_name.clone(),
        );

        if self.config.news_api.api_key.as_deref().is_some_and(|key| !key.trim().is_empty()) {
            let news_api = HttpNewsApiClient::new(&self.config.news_api)
                .map_err(|e| AppError::Client(e.to_string()))?;
            state = state.with_news_api(Arc::new(news_api));
        } else {
            warn!("No News API key configured; /news-api/request is disabled");
        }

        if let Some(dir) = &self.config.automation.excel_files_dir {
            info!("Serving automation spreadsheets from {}", dir);
            state = state.with_excel_files(ExcelFileStore::new(dir));
        }

        Ok(state)
    }
}

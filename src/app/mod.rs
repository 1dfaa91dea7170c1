//! Application module for composition and lifecycle

mod state;

pub use state::StateProvider;

use crate::{
    api::{ApiServer, ApiState},
    config::Config,
};
use std::net::SocketAddr;
use thiserror::Error;
use tracing::{error, info};

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Application result type
pub type Result<T> = std::result::Result<T, AppError>;

/// The API service and its dependencies
pub struct App {
    state: ApiState,
    server: ApiServer,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                AppError::Config(crate::config::ConfigError::InvalidValue(format!(
                    "server address {}:{}: {}",
                    config.server.host, config.server.port, e
                )))
            })?;

        let state = StateProvider::new(&config).provide().await?;
        Ok(Self { state, server: ApiServer::new(addr) })
    }

    /// Serve requests until SIGTERM, SIGINT or SIGHUP
    pub async fn run_until_shutdown(self) -> Result<()> {
        let server = self.server.clone();
        let mut handle = tokio::spawn(async move { server.run(self.state).await });

        tokio::select! {
            result = &mut handle => {
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(AppError::Server(e)),
                    Err(e) => Err(AppError::Server(std::io::Error::other(e))),
                };
            },
            signal = wait_for_shutdown() => signal?,
        }

        info!("Shutdown initiated, failing health checks first...");
        self.server.shutdown().await;

        match handle.await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => error!("API server error during shutdown: {}", e),
            Err(e) => error!("API server task failed: {}", e),
        }

        info!("Shutdown complete");
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGTERM, SIGINT, or SIGHUP)
pub async fn wait_for_shutdown() -> std::io::Result<()> {
    use std::time::Duration;
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown"),
        _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown"),
        _ = sighup.recv() => info!("SIGHUP received, initiating graceful shutdown"),
    }

    // Safety net if connections never drain
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        info!("Shutdown timeout reached (30s), forcing exit");
        std::process::exit(0);
    });

    Ok(())
}

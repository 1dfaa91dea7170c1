//! Client for the external duplicate-analysis job queuer.
//!
//! The queuer owns the analysis itself; this side only starts, polls,
//! cancels and clears jobs, relaying whatever status and JSON body the
//! queuer answered with.
pub mod client;

pub use client::HttpDeduperClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeduperError {
    #[error("Deduper request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Deduper returned a non-JSON body (status {status}): {message}")]
    InvalidBody { status: u16, message: String },

    #[error("Invalid deduper base URL {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },
}

/// Status and JSON body as answered by the queuer
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

#[async_trait]
pub trait DeduperClient: Send + Sync {
    async fn request_job(&self, report_id: i64) -> Result<UpstreamResponse, DeduperError>;

    async fn list_jobs(&self) -> Result<UpstreamResponse, DeduperError>;

    async fn job_status(&self, job_id: &str) -> Result<UpstreamResponse, DeduperError>;

    async fn cancel_job(&self, job_id: &str) -> Result<UpstreamResponse, DeduperError>;

    async fn clear_table(&self) -> Result<UpstreamResponse, DeduperError>;
}

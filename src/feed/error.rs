use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("RSS request failed with status {0}")]
    Status(u16),

    #[error("RSS request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RSS parse error: {0}")]
    Parse(String),
}

impl FeedError {
    /// Upstream HTTP status, when the feed answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FeedError::Status(code) => Some(*code),
            FeedError::Http(e) => e.status().map(|s| s.as_u16()),
            FeedError::Parse(_) => None,
        }
    }

    /// Google answers 503 once its RSS rate limit is exceeded.
    pub fn is_rate_limited(&self) -> bool {
        self.status_code() == Some(503)
    }
}

impl From<quick_xml::Error> for FeedError {
    fn from(e: quick_xml::Error) -> Self {
        FeedError::Parse(e.to_string())
    }
}

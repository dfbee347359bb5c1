pub mod http_fetcher;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Status;

/// Query parameters of an API call. `since` also becomes `If-Modified-Since`.
pub type Query = BTreeMap<String, String>;

/// Every way an API call can fail. Callers never see the transport error
/// kind directly; it is wrapped here.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Server Returned Error: {0}")]
    Server(String),

    /// HTTP 400, the API's answer to an exceeded rate limit
    #[error("{status}: {reason}")]
    RateLimited { status: u16, reason: String },

    #[error("Server Returned {status} {reason}")]
    UnexpectedStatus { status: u16, reason: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. })
    }
}

#[async_trait]
pub trait TimelineFetcher: Send + Sync {
    /// Fetch `{api_base}/{path}.json`. A `304 Not Modified` yields an empty list.
    async fn fetch(&self, path: &str, query: Query) -> Result<Vec<Status>, ApiError>;
}

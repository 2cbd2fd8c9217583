use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("URL rejected: {0}")]
    CanonReject(#[from] crate::canon::CanonReject),

    #[error("Out of scope: {0}")]
    ScopeReject(String),

    #[error("HTTP request failed: {0}")]
    FetchTransport(#[from] reqwest::Error),

    #[error("Request timed out after {0} ms")]
    FetchTimeout(u64),

    #[error("HTTP error status {0}")]
    FetchHttp(u16),

    #[error("Parse error: {0}")]
    ExtractParse(String),

    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("Rule '{name}' failed to compile: {reason}")]
    RuleCompile { name: String, reason: String },

    #[error("Response body exceeded {0} bytes")]
    BodyTooLarge(usize),

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<regex::Error> for ScanError {
    fn from(e: regex::Error) -> Self {
        ScanError::ExtractParse(e.to_string())
    }
}

impl ScanError {
    /// Transport failures and timeouts are worth another attempt; everything
    /// else is final for the item.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScanError::FetchTimeout(_) => true,
            ScanError::FetchTransport(e) => !e.is_builder() && !e.is_redirect(),
            ScanError::FetchHttp(status) => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the Pi Network API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Payment provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Payment provider returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Payment provider request timed out")]
    Timeout,

    #[error("Invalid payment provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Classifies a transport failure; elapsed timeouts get their own variant.
    pub fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Http(err)
        }
    }

    /// Connection failures, 429 and 5xx may be retried. Timeouts and other 4xx may not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http(err) => err.is_connect(),
            ProviderError::Status { status, .. } => Self::is_retryable_status(*status),
            ProviderError::Timeout | ProviderError::Decode(_) => false,
        }
    }

    /// 429 and 5xx are transient on the provider side.
    pub fn is_retryable_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

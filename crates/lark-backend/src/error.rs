use std::time::Duration;

use digest_core::{DigestError, Retryable};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LarkError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("Webhook returned a non-JSON body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Webhook returned HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
        /// Server-requested wait before the next attempt
        retry_after: Option<Duration>,
    },

    #[error("Webhook rejected the message (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Webhook response carried no status code: {0}")]
    Unacknowledged(String),

    #[error("Run deadline exceeded before the message could be sent")]
    DeadlineExceeded,
}

pub type Result<T> = std::result::Result<T, LarkError>;

impl Retryable for LarkError {
    fn is_retryable(&self) -> bool {
        match self {
            LarkError::Http(e) => matches!(
                e,
                ureq::Error::Io(_)
                    | ureq::Error::Timeout(_)
                    | ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Protocol(_)
                    | ureq::Error::Tls(_)
                    | ureq::Error::ConnectProxyFailed(_)
            ),
            LarkError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            LarkError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<LarkError> for DigestError {
    fn from(err: LarkError) -> Self {
        DigestError::Delivery(err.to_string())
    }
}

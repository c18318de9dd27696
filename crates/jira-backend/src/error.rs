use std::time::Duration;

use digest_core::{DigestError, Retryable};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JiraError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Authentication failed ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Rate limited by Jira")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Issue {key} has an unreadable timestamp '{value}'")]
    InvalidTimestamp { key: String, value: String },

    #[error("Run deadline exceeded before the request could be sent")]
    DeadlineExceeded,
}

pub type Result<T> = std::result::Result<T, JiraError>;

impl Retryable for JiraError {
    fn is_retryable(&self) -> bool {
        match self {
            JiraError::Http(e) => is_transient_transport(e),
            JiraError::RateLimited { .. } => true,
            JiraError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            JiraError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

fn is_transient_transport(err: &ureq::Error) -> bool {
    matches!(
        err,
        ureq::Error::Io(_)
            | ureq::Error::Timeout(_)
            | ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound
            | ureq::Error::Protocol(_)
            | ureq::Error::Tls(_)
            | ureq::Error::ConnectProxyFailed(_)
    )
}

impl From<JiraError> for DigestError {
    fn from(err: JiraError) -> Self {
        let retryable = err.is_retryable();
        match err {
            JiraError::Unauthorized { .. } => DigestError::Auth(err.to_string()),
            // Never reached Jira, so it says nothing about the filter
            JiraError::Http(_) | JiraError::DeadlineExceeded => {
                DigestError::Transient(err.to_string())
            }
            _ if retryable => DigestError::Transient(err.to_string()),
            _ => DigestError::Query(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_status_errors() {
        let unauthorized = JiraError::Unauthorized {
            status: 401,
            message: "bad token".to_string(),
        };
        assert!(!unauthorized.is_retryable());
        assert_eq!(DigestError::from(unauthorized).kind(), "auth");

        let bad_jql = JiraError::Api {
            status: 400,
            message: "Field 'x' does not exist".to_string(),
        };
        assert!(!bad_jql.is_retryable());
        assert_eq!(DigestError::from(bad_jql).kind(), "query");

        let unavailable = JiraError::Api {
            status: 503,
            message: "HTTP 503".to_string(),
        };
        assert!(unavailable.is_retryable());
        assert_eq!(DigestError::from(unavailable).kind(), "transient");
    }

    #[test]
    fn rate_limit_carries_retry_after() {
        let limited = JiraError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        };
        assert!(limited.is_retryable());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(DigestError::from(limited).kind(), "transient");
    }

    #[test]
    fn transport_failures_are_transient() {
        let tls = JiraError::Http(ureq::Error::Tls("handshake failed"));
        assert!(tls.is_retryable());
        assert_eq!(DigestError::from(tls).kind(), "transient");

        let bad_uri = JiraError::Http(ureq::Error::BadUri("no host".to_string()));
        assert!(!bad_uri.is_retryable());
        assert_eq!(DigestError::from(bad_uri).kind(), "transient");
    }

    #[test]
    fn deadline_is_transient() {
        assert_eq!(DigestError::from(JiraError::DeadlineExceeded).kind(), "transient");
    }
}

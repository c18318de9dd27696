use thiserror::Error;

/// Failure taxonomy shared by every pipeline stage
///
/// Backends keep their own detailed error enums and convert into this one at
/// the trait boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// Invalid or expired credentials. Never retried.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Malformed filter or a non-2xx, non-auth response from the tracker
    #[error("Query rejected: {0}")]
    Query(String),

    /// Network failure, timeout, 5xx or rate limit that outlived the retry budget
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The chat sink rejected the message or stayed unreachable
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl DigestError {
    /// Short machine-friendly name used in structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            DigestError::Auth(_) => "auth",
            DigestError::Query(_) => "query",
            DigestError::Transient(_) => "transient",
            DigestError::Delivery(_) => "delivery",
        }
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;

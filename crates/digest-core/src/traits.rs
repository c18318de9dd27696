use crate::error::Result;
use crate::models::{Issue, Message};
use crate::retry::Deadline;

/// Source of recently updated issues
///
/// Implementations authenticate, page through the search API and return the
/// issues in the tracker's own order.
pub trait IssueSource: Send + Sync {
    /// Run a filter query and return at most `max_results` issues.
    ///
    /// Fails with `Auth` on rejected credentials, `Query` on a malformed filter
    /// or other non-auth client errors, and `Transient` once retries or the
    /// run deadline are exhausted.
    fn fetch(&self, jql: &str, max_results: usize, deadline: &Deadline) -> Result<Vec<Issue>>;
}

/// Destination for rendered reports
pub trait NotificationSink: Send + Sync {
    /// Deliver a message, retrying transient failures.
    ///
    /// Fails with `Delivery` when the sink rejects the message (including
    /// application-level errors carried by a 2xx response) or stays unreachable.
    fn deliver(&self, message: &Message, deadline: &Deadline) -> Result<DeliveryResult>;
}

/// Acknowledgement returned by a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    /// HTTP status of the accepted request
    pub status: u16,
    /// Application-level status code reported by the sink
    pub code: i64,
    /// Application-level status message
    pub message: String,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

use std::time::Duration;

use digest_core::{Deadline, DeliveryResult, Message, RetryPolicy};
use tracing::debug;
use ureq::Agent;

use crate::error::{LarkError, Result};
use crate::models::*;

/// Default ceiling for a single webhook call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Custom-bot webhook client
pub struct LarkClient {
    agent: Agent,
    webhook_url: String,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl LarkClient {
    pub fn new(webhook_url: &str) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(DEFAULT_REQUEST_TIMEOUT))
            // Status codes are inspected below, alongside the body's own code
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            webhook_url: webhook_url.trim().to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Post a message, retrying transient failures within `deadline`.
    ///
    /// Succeeds only when the webhook answers 2xx *and* reports code 0.
    pub fn send(&self, message: &Message, deadline: &Deadline) -> Result<DeliveryResult> {
        let payload = WebhookPayload::from(message);
        let mut attempts = 0;

        let (status, response) = self.retry.execute("lark.webhook", deadline, |attempt| {
            attempts = attempt;
            debug!(attempt, msg_type = %message.message_type(), "Posting to webhook");
            self.post_once(&payload, deadline)
        })?;

        Ok(DeliveryResult {
            status,
            code: response.code().unwrap_or_default(),
            message: response.message().to_string(),
            attempts,
        })
    }

    fn post_once(&self, payload: &WebhookPayload<'_>, deadline: &Deadline) -> Result<(u16, WebhookResponse)> {
        let timeout = deadline
            .cap(self.request_timeout)
            .ok_or(LarkError::DeadlineExceeded)?;

        let mut response = self
            .agent
            .post(&self.webhook_url)
            .config()
            .timeout_global(Some(timeout))
            .build()
            .send_json(payload)?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response
            .body_mut()
            .read_to_string()
            .unwrap_or_else(|_| String::new());

        if !(200..300).contains(&status) {
            return Err(LarkError::Status {
                status,
                body,
                retry_after,
            });
        }

        let parsed: WebhookResponse = serde_json::from_str(&body)?;
        match parsed.code() {
            Some(0) => Ok((status, parsed)),
            Some(code) => Err(LarkError::Rejected {
                code,
                message: parsed.message().to_string(),
            }),
            None => Err(LarkError::Unacknowledged(body)),
        }
    }
}

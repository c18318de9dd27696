use serde::Deserialize;

/// Webhook response body.
///
/// Current endpoints answer `{"code": 0, "msg": "success"}`; older ones
/// answer `{"StatusCode": 0, "StatusMessage": "success"}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookResponse {
    pub code: Option<i64>,
    pub msg: Option<String>,
    #[serde(rename = "StatusCode")]
    pub status_code: Option<i64>,
    #[serde(rename = "StatusMessage")]
    pub status_message: Option<String>,
}

impl WebhookResponse {
    /// Application-level status code, if the body carried one
    pub fn code(&self) -> Option<i64> {
        self.code.or(self.status_code)
    }

    pub fn message(&self) -> &str {
        self.msg
            .as_deref()
            .or(self.status_message.as_deref())
            .unwrap_or_default()
    }
}

pub mod config;
pub mod preview;
pub mod run;

use digest_core::RetryPolicy;
use jira_backend::JiraClient;
use lark_backend::LarkClient;

use crate::config::{JiraSettings, Settings};

pub fn jira_client(settings: &JiraSettings, retry: &RetryPolicy) -> JiraClient {
    JiraClient::new(&settings.base_url, &settings.credentials)
        .with_api_version(settings.api_version.clone())
        .with_page_size(settings.page_size)
        .with_request_timeout(settings.request_timeout)
        .with_retry_policy(retry.clone())
        .with_field_paths(settings.fields.clone())
}

pub fn lark_client(settings: &Settings) -> LarkClient {
    LarkClient::new(&settings.webhook_url)
        .with_request_timeout(settings.lark_request_timeout)
        .with_retry_policy(settings.retry.clone())
}

//! Unit tests for LarkClient using wiremock

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::client::LarkClient;
    use digest_core::{Deadline, DigestError, Message, NotificationSink, PostElement, RetryPolicy};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HOOK_PATH: &str = "/open-apis/bot/v2/hook/test-hook";

    fn client(server: &MockServer) -> LarkClient {
        LarkClient::new(&format!("{}{}", server.uri(), HOOK_PATH))
            .with_retry_policy(RetryPolicy::immediate(3))
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(30))
    }

    fn text(body: &str) -> Message {
        Message::Text {
            body: body.to_string(),
        }
    }

    fn success() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": {},
            "msg": "success"
        }))
    }

    #[tokio::test]
    async fn test_send_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .and(body_json(serde_json::json!({
                "msg_type": "text",
                "content": { "text": "hello" }
            })))
            .respond_with(success())
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).deliver(&text("hello"), &deadline()).unwrap();
        assert_eq!(result.status, 200);
        assert_eq!(result.code, 0);
        assert_eq!(result.message, "success");
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn test_send_post() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .and(body_json(serde_json::json!({
                "msg_type": "post",
                "content": {
                    "post": {
                        "zh_cn": {
                            "title": "Daily",
                            "content": [[
                                { "tag": "a", "text": "ABC-1", "href": "https://jira/browse/ABC-1" },
                                { "tag": "text", "text": " — Fix login (Done)" }
                            ]]
                        }
                    }
                }
            })))
            .respond_with(success())
            .expect(1)
            .mount(&mock_server)
            .await;

        let message = Message::Post {
            title: "Daily".to_string(),
            rows: vec![vec![
                PostElement::link("ABC-1", "https://jira/browse/ABC-1"),
                PostElement::text(" — Fix login (Done)"),
            ]],
        };
        client(&mock_server).deliver(&message, &deadline()).unwrap();
    }

    #[tokio::test]
    async fn test_legacy_status_code_accepted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Extra": null,
                "StatusCode": 0,
                "StatusMessage": "success"
            })))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).deliver(&text("hi"), &deadline()).unwrap();
        assert_eq!(result.code, 0);
    }

    #[tokio::test]
    async fn test_nonzero_code_fails_despite_http_200() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 9499,
                "msg": "Bad Request",
                "data": {}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).deliver(&text("hi"), &deadline()).unwrap_err();
        match err {
            DigestError::Delivery(message) => {
                assert!(message.contains("9499"));
                assert!(message.contains("Bad Request"));
            }
            other => panic!("expected delivery error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_code_is_a_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).deliver(&text("hi"), &deadline()).unwrap_err();
        assert!(matches!(err, DigestError::Delivery(_)));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .expect(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .respond_with(success())
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).deliver(&text("hi"), &deadline()).unwrap();
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn test_rate_limit_waits_for_retry_after() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .respond_with(success())
            .expect(1)
            .mount(&mock_server)
            .await;

        // Computed backoff is zero, so any wait comes from the header
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::from_secs(5),
        };
        let client = LarkClient::new(&format!("{}{}", mock_server.uri(), HOOK_PATH))
            .with_retry_policy(policy);

        let started = Instant::now();
        let result = client.deliver(&text("hi"), &deadline()).unwrap();
        assert_eq!(result.attempts, 2);
        assert!(started.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_budget() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).deliver(&text("hi"), &deadline()).unwrap_err();
        match err {
            DigestError::Delivery(message) => assert!(message.contains("HTTP 500")),
            other => panic!("expected delivery error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = client(&mock_server).deliver(&text("hi"), &deadline()).unwrap_err();
        assert!(matches!(err, DigestError::Delivery(_)));
    }

    #[tokio::test]
    async fn test_expired_deadline_sends_nothing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(success())
            .expect(0)
            .mount(&mock_server)
            .await;

        let expired = Deadline::after(Duration::ZERO);
        let err = client(&mock_server).deliver(&text("hi"), &expired).unwrap_err();
        assert!(matches!(err, DigestError::Delivery(_)));
    }
}

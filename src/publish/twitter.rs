use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;

use super::auth::{oauth_header, Credentials};
use super::{PublishError, Publisher};

/// Default API host for the status endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.twitter.com";

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(20);

/// Posts statuses through the `POST /2/tweets` endpoint.
pub struct TwitterPublisher {
    client: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
}

impl TwitterPublisher {
    /// Create a publisher for `api_base_url` (e.g. `https://api.twitter.com`).
    pub fn new(client: reqwest::Client, api_base_url: &str, credentials: Credentials) -> Self {
        Self {
            client,
            endpoint: format!("{}/2/tweets", api_base_url.trim_end_matches('/')),
            credentials,
        }
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    async fn publish(&self, message: &str) -> Result<(), PublishError> {
        let body = serde_json::json!({ "text": message });
        let mut request = self.client.post(&self.endpoint).json(&body);

        request = match &self.credentials {
            Credentials::OAuth { .. } => {
                // JSON bodies are not part of the OAuth signature
                let header = oauth_header("POST", &self.endpoint, &[], &self.credentials)?;
                request.header(AUTHORIZATION, header)
            }
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose_secret()))
            }
        };

        let response = tokio::time::timeout(PUBLISH_TIMEOUT, request.send())
            .await
            .map_err(|_| PublishError::Timeout)?
            .map_err(PublishError::Network)?;

        let status = response.status();
        if status.is_success() {
            tracing::trace!(status = status.as_u16(), "Status posted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status.as_u16(), &body))
    }
}

/// Error payloads seen from the v2 API (`detail`/`title`) and v1.1 (`errors[]`).
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
    title: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    message: Option<String>,
    detail: Option<String>,
}

fn failure_reason(body: &str) -> String {
    let parsed = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed,
        Err(_) => return body.trim().to_string(),
    };

    parsed
        .detail
        .or_else(|| {
            parsed
                .errors
                .into_iter()
                .find_map(|e| e.message.or(e.detail))
        })
        .or(parsed.title)
        .unwrap_or_else(|| body.trim().to_string())
}

/// The only place a failure reason is matched against "duplicate".
fn classify_failure(status: u16, body: &str) -> PublishError {
    let reason = failure_reason(body);
    if reason.to_lowercase().contains("duplicate") {
        PublishError::DuplicateContent(reason)
    } else {
        PublishError::Rejected { status, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oauth_credentials() -> Credentials {
        Credentials::from_args(&["ck".into(), "cs".into(), "at".into(), "as".into()]).unwrap()
    }

    #[test]
    fn test_classify_v2_duplicate() {
        let body = r#"{"detail":"You are not allowed to create a Tweet with duplicate content.","type":"about:blank","title":"Forbidden","status":403}"#;
        match classify_failure(403, body) {
            PublishError::DuplicateContent(reason) => {
                assert!(reason.contains("duplicate content"))
            }
            other => panic!("Expected DuplicateContent, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_v1_duplicate() {
        let body = r#"{"errors":[{"code":187,"message":"Status is a duplicate."}]}"#;
        assert!(classify_failure(403, body).is_duplicate());
    }

    #[test]
    fn test_classify_other_rejection() {
        let body = r#"{"title":"Unauthorized","type":"about:blank","status":401,"detail":"Unauthorized"}"#;
        match classify_failure(401, body) {
            PublishError::Rejected { status, reason } => {
                assert_eq!(status, 401);
                assert_eq!(reason, "Unauthorized");
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_plain_text_body() {
        assert!(classify_failure(403, "  Duplicate status  ").is_duplicate());
        match classify_failure(503, "Service Unavailable") {
            PublishError::Rejected { reason, .. } => assert_eq!(reason, "Service Unavailable"),
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_oauth_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header_exists("authorization"))
            .and(body_json(serde_json::json!({ "text": "hello world" })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_string(r#"{"data":{"id":"1","text":"hello world"}}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let publisher =
            TwitterPublisher::new(reqwest::Client::new(), &mock_server.uri(), oauth_credentials());
        publisher.publish("hello world").await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let auth = requests[0]
            .headers
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(auth.starts_with("OAuth "));
        assert!(auth.contains("oauth_consumer_key=\"ck\""));
        assert!(auth.contains("oauth_token=\"at\""));
        assert!(auth.contains("oauth_signature=\""));
    }

    #[tokio::test]
    async fn test_publish_basic_auth() {
        let mock_server = MockServer::start().await;
        // base64("user:pass")
        Mock::given(method("POST"))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let credentials = Credentials::from_args(&["user".into(), "pass".into()]).unwrap();
        let publisher =
            TwitterPublisher::new(reqwest::Client::new(), &mock_server.uri(), credentials);
        publisher.publish("hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_duplicate_rejection() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                r#"{"detail":"You are not allowed to create a Tweet with duplicate content.","title":"Forbidden","status":403}"#,
            ))
            .mount(&mock_server)
            .await;

        let publisher =
            TwitterPublisher::new(reqwest::Client::new(), &mock_server.uri(), oauth_credentials());
        let err = publisher.publish("again").await.unwrap_err();
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn test_publish_other_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429).set_body_string(r#"{"title":"Too Many Requests"}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let publisher =
            TwitterPublisher::new(reqwest::Client::new(), &mock_server.uri(), oauth_credentials());
        match publisher.publish("hello").await {
            Err(PublishError::Rejected { status, reason }) => {
                assert_eq!(status, 429);
                assert_eq!(reason, "Too Many Requests");
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let publisher = TwitterPublisher::new(
            reqwest::Client::new(),
            "https://api.example.com/",
            oauth_credentials(),
        );
        assert_eq!(publisher.endpoint, "https://api.example.com/2/tweets");
    }
}

// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Instagram Graph API send path.
//!
//! One call is one attempt; retry/backoff belongs to the dispatcher. Errors
//! are classified into [`SendErrorKind`] from the Graph error envelope so
//! the retry predicate can distinguish transient from permanent failures.

use std::time::Duration;

use async_trait::async_trait;
use igrelay_core::{IgrelayError, SendError, SendErrorKind, SendTransport};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

/// Default Graph API host; the version segment is appended per config.
const GRAPH_API_HOST: &str = "https://graph.facebook.com";

/// Graph API client implementing [`SendTransport`].
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

/// Success body of `POST /me/messages`.
#[derive(Debug, Deserialize)]
struct SendResponse {
    message_id: Option<String>,
}

/// Error envelope shared by all Graph API endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphErrorResponse {
    pub(crate) error: GraphErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphErrorDetail {
    pub(crate) message: String,
    #[serde(rename = "type")]
    pub(crate) type_: Option<String>,
    pub(crate) code: Option<i64>,
    pub(crate) error_subcode: Option<i64>,
}

impl GraphClient {
    /// Creates a client for the given API version with an explicit request
    /// timeout. `base_url` overrides the Graph host (tests, proxies).
    pub fn new(
        graph_api_version: &str,
        timeout: Duration,
        base_url: Option<String>,
    ) -> Result<Self, IgrelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IgrelayError::Graph {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let base_url =
            base_url.unwrap_or_else(|| format!("{GRAPH_API_HOST}/{graph_api_version}"));

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl SendTransport for GraphClient {
    async fn send_text(
        &self,
        page_token: &str,
        recipient_id: &str,
        text: &str,
    ) -> Result<String, SendError> {
        let url = format!("{}/me/messages", self.base_url);
        let payload = serde_json::json!({
            "recipient": {"id": recipient_id},
            "message": {"text": text},
        });

        // The token goes in the query string, not the JSON payload.
        let response = self
            .client
            .post(&url)
            .query(&[("access_token", page_token)])
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, self.timeout))?;

        let status = response.status();
        debug!(status = %status, recipient_id, "send response received");

        if status.is_success() {
            let body: SendResponse = response.json().await.map_err(|e| {
                SendError::new(
                    SendErrorKind::Other,
                    format!("failed to parse send response: {e}"),
                )
            })?;
            return body.message_id.ok_or_else(|| {
                SendError::new(SendErrorKind::Other, "send response carried no message_id")
            });
        }

        let retry_after = parse_retry_after(&response);
        let body = response.text().await.unwrap_or_default();
        let mut error = classify_api_error(status, &body);
        if let Some(retry_after) = retry_after {
            error = error.with_retry_after(retry_after);
        }
        Err(error)
    }
}

fn classify_transport_error(err: reqwest::Error, timeout: Duration) -> SendError {
    if err.is_timeout() {
        SendError::new(
            SendErrorKind::Timeout,
            format!("request timed out after {timeout:?}"),
        )
    } else {
        SendError::new(
            SendErrorKind::ServerError,
            format!("HTTP request failed: {err}"),
        )
    }
}

fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Map a non-2xx Graph response to a [`SendError`].
///
/// Graph error codes: 4/17/613 are rate limits, 190 is an invalid or
/// revoked token, 10 and the 2xx block are permission errors, 100 with
/// subcode 2018001 (and 551) mean the recipient cannot be messaged.
fn classify_api_error(status: StatusCode, body: &str) -> SendError {
    let detail = serde_json::from_str::<GraphErrorResponse>(body).ok();
    let message = detail
        .as_ref()
        .map(|d| d.error.message.clone())
        .unwrap_or_else(|| format!("Graph API returned {status}: {body}"));

    let kind = match detail.as_ref().and_then(|d| d.error.code) {
        Some(4) | Some(17) | Some(613) => SendErrorKind::RateLimited,
        Some(190) => SendErrorKind::PermissionRevoked,
        Some(10) => SendErrorKind::PermissionRevoked,
        Some(code) if (200..300).contains(&code) => SendErrorKind::PermissionRevoked,
        Some(551) => SendErrorKind::InvalidRecipient,
        Some(100) => {
            let subcode = detail.as_ref().and_then(|d| d.error.error_subcode);
            if subcode == Some(2018001) {
                SendErrorKind::InvalidRecipient
            } else {
                SendErrorKind::Other
            }
        }
        _ if status.as_u16() == 429 => SendErrorKind::RateLimited,
        _ if status.is_server_error() => SendErrorKind::ServerError,
        _ => SendErrorKind::Other,
    };

    SendError::new(kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> GraphClient {
        GraphClient::new("v17.0", Duration::from_secs(5), Some(base_url.to_string())).unwrap()
    }

    fn graph_error(code: i64, subcode: Option<i64>, message: &str) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "message": message,
                "type": "OAuthException",
                "code": code,
                "error_subcode": subcode,
            }
        })
    }

    #[test]
    fn default_base_url_includes_version() {
        let client = GraphClient::new("v17.0", Duration::from_secs(5), None).unwrap();
        assert_eq!(client.base_url(), "https://graph.facebook.com/v17.0");
    }

    #[tokio::test]
    async fn send_text_success_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/messages"))
            .and(query_param("access_token", "tok-1"))
            .and(body_partial_json(serde_json::json!({
                "recipient": {"id": "ig-user-9"},
                "message": {"text": "hello"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "recipient_id": "ig-user-9",
                "message_id": "mid.abc123"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let id = client.send_text("tok-1", "ig-user-9", "hello").await.unwrap();
        assert_eq!(id, "mid.abc123");
    }

    #[tokio::test]
    async fn rate_limit_code_classifies_with_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .insert_header("retry-after", "7")
                    .set_body_json(graph_error(4, None, "Application request limit reached")),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.send_text("tok", "user", "hi").await.unwrap_err();
        assert_eq!(err.kind, SendErrorKind::RateLimited);
        assert_eq!(err.retry_after, Some(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn invalid_recipient_classifies_as_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(graph_error(
                100,
                Some(2018001),
                "No matching user found",
            )))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.send_text("tok", "ghost", "hi").await.unwrap_err();
        assert_eq!(err.kind, SendErrorKind::InvalidRecipient);
        assert!(!err.kind.is_transient());
    }

    #[tokio::test]
    async fn revoked_token_classifies_as_permission_revoked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(graph_error(
                190,
                None,
                "Error validating access token",
            )))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.send_text("tok", "user", "hi").await.unwrap_err();
        assert_eq!(err.kind, SendErrorKind::PermissionRevoked);
        assert!(err.detail.contains("validating access token"));
    }

    #[tokio::test]
    async fn server_error_classifies_as_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.send_text("tok", "user", "hi").await.unwrap_err();
        assert_eq!(err.kind, SendErrorKind::ServerError);
        assert!(err.kind.is_transient());
    }

    #[tokio::test]
    async fn timeout_classifies_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message_id": "mid.late"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client =
            GraphClient::new("v17.0", Duration::from_millis(200), Some(server.uri())).unwrap();
        let err = client.send_text("tok", "user", "hi").await.unwrap_err();
        assert_eq!(err.kind, SendErrorKind::Timeout);
    }

    #[tokio::test]
    async fn missing_message_id_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"recipient_id": "user"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.send_text("tok", "user", "hi").await.unwrap_err();
        assert_eq!(err.kind, SendErrorKind::Other);
    }
}

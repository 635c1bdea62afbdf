// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenAI Chat Completions API.
//!
//! One call is one attempt: the webhook latency budget does not allow
//! synchronous retries here, so failures are classified
//! ([`AiErrorKind`]) and handed back for the pipeline's fallback policy.

use std::time::Duration;

use igrelay_core::{AiErrorKind, IgrelayError};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{ApiErrorResponse, ChatRequest, ChatResponse};

/// Base URL for the Chat Completions endpoint.
const API_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// HTTP client for OpenAI API communication.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OpenAiClient {
    /// Creates a new client with bearer authentication and an explicit
    /// request timeout.
    pub fn new(
        api_key: String,
        timeout: Duration,
        base_url: Option<String>,
    ) -> Result<Self, IgrelayError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {api_key}");
        headers.insert(
            "authorization",
            HeaderValue::from_str(&bearer).map_err(|e| {
                IgrelayError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| IgrelayError::Provider {
                kind: AiErrorKind::ProviderUnavailable,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| API_BASE_URL.to_string()),
            timeout,
        })
    }

    /// Sends one completion request and classifies any failure.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, IgrelayError> {
        let response = self
            .client
            .post(&self.base_url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        debug!(status = %status, model = %request.model, "completion response received");

        if status.is_success() {
            let body = response.text().await.map_err(|e| IgrelayError::Provider {
                kind: AiErrorKind::ProviderUnavailable,
                message: format!("failed to read response body: {e}"),
            })?;
            return serde_json::from_str(&body).map_err(|e| IgrelayError::Provider {
                kind: AiErrorKind::ProviderUnavailable,
                message: format!("failed to parse API response: {e}"),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_api_error(status, &body))
    }

    fn classify_transport_error(&self, err: reqwest::Error) -> IgrelayError {
        if err.is_timeout() {
            IgrelayError::Provider {
                kind: AiErrorKind::Timeout,
                message: format!("request timed out after {:?}", self.timeout),
            }
        } else {
            IgrelayError::Provider {
                kind: AiErrorKind::ProviderUnavailable,
                message: format!("HTTP request failed: {err}"),
            }
        }
    }
}

/// Map a non-2xx response to an [`AiErrorKind`]-carrying error.
///
/// 429 is rate limiting; 5xx is unavailability; a 4xx carrying a content
/// policy code is a rejection. Anything else is treated as unavailability so
/// the customer-facing policy stays conservative.
fn classify_api_error(status: reqwest::StatusCode, body: &str) -> IgrelayError {
    let detail = serde_json::from_str::<ApiErrorResponse>(body).ok();
    let message = detail
        .as_ref()
        .map(|d| d.error.message.clone())
        .unwrap_or_else(|| format!("API returned {status}: {body}"));

    let kind = if status.as_u16() == 429 {
        AiErrorKind::RateLimited
    } else if status.is_server_error() {
        AiErrorKind::ProviderUnavailable
    } else if is_content_policy(detail.as_ref()) {
        AiErrorKind::ContentRejected
    } else {
        AiErrorKind::ProviderUnavailable
    };

    IgrelayError::Provider { kind, message }
}

fn is_content_policy(detail: Option<&ApiErrorResponse>) -> bool {
    let Some(detail) = detail else { return false };
    let code = detail.error.code.as_deref().unwrap_or_default();
    let type_ = detail.error.type_.as_deref().unwrap_or_default();
    code.contains("content_policy") || type_.contains("content_policy")
}

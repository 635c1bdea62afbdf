// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin endpoints for the external OAuth/admin collaborator: token
//! record/clear and a test send. The gateway stores what the OAuth flow
//! hands it; it does not run the redirect or token exchange itself.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use igrelay_core::{DeliveryStatus, Direction, DispatchOutcome, MessageLog};
use igrelay_storage::database::now_iso;
use igrelay_storage::queries::{businesses, messages};

use crate::server::GatewayState;

/// Request body for POST /v1/businesses/{id}/token.
#[derive(Debug, Deserialize)]
pub struct RecordTokenRequest {
    pub access_token: String,
    /// RFC 3339 expiry; absent for tokens without a reported expiry.
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Request body for POST /v1/businesses/{id}/test-message.
#[derive(Debug, Deserialize)]
pub struct TestMessageRequest {
    pub recipient_id: String,
    pub text: String,
}

/// Response body for the test send.
#[derive(Debug, Serialize)]
pub struct TestMessageResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// POST /v1/businesses/{id}/token
///
/// Records credentials handed over by the OAuth flow. The expiry, when
/// present, must parse as RFC 3339 -- a malformed one would silently render
/// the token expired.
pub async fn record_token(
    State(state): State<GatewayState>,
    Path(business_id): Path<String>,
    Json(body): Json<RecordTokenRequest>,
) -> Response {
    if body.access_token.trim().is_empty() {
        return bad_request("access_token must not be empty");
    }
    if let Some(expires_at) = &body.expires_at
        && chrono_parse_ok(expires_at).is_none()
    {
        return bad_request("expires_at must be an RFC 3339 timestamp");
    }

    match state
        .tokens
        .record_token(
            &state.db,
            &business_id,
            &body.access_token,
            body.expires_at.as_deref(),
        )
        .await
    {
        Ok(true) => {
            info!(business_id, "page token recorded");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => not_found(&business_id),
        Err(err) => storage_error(err),
    }
}

/// DELETE /v1/businesses/{id}/token
///
/// Admin-triggered disconnect: clears the page credentials.
pub async fn clear_token(
    State(state): State<GatewayState>,
    Path(business_id): Path<String>,
) -> Response {
    match state.tokens.clear_token(&state.db, &business_id).await {
        Ok(true) => {
            info!(business_id, "page token cleared");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => not_found(&business_id),
        Err(err) => storage_error(err),
    }
}

/// POST /v1/businesses/{id}/test-message
///
/// Admin-triggered send, logged without a causal link to any inbound row.
pub async fn send_test_message(
    State(state): State<GatewayState>,
    Path(business_id): Path<String>,
    Json(body): Json<TestMessageRequest>,
) -> Response {
    let business = match businesses::get_business(&state.db, &business_id).await {
        Ok(Some(business)) => business,
        Ok(None) => return not_found(&business_id),
        Err(err) => return storage_error(err),
    };

    let outbound_id = uuid::Uuid::new_v4().to_string();
    let now = now_iso();
    let log = MessageLog {
        id: outbound_id.clone(),
        business_id: business.id.clone(),
        customer_id: None,
        direction: Direction::Outbound,
        text: body.text.clone(),
        status: DeliveryStatus::Pending,
        provider_message_id: None,
        error_detail: None,
        in_reply_to: None,
        created_at: now.clone(),
        updated_at: now,
    };
    if let Err(err) = messages::insert_message(&state.db, &log).await {
        return storage_error(err);
    }

    let token = match state.tokens.get_valid_token(&state.db, &business.id).await {
        Ok(token) => token,
        Err(err) => return storage_error(err),
    };
    let outcome = state
        .dispatcher
        .dispatch(&token, &body.recipient_id, &body.text)
        .await;

    let response = match outcome {
        DispatchOutcome::Sent {
            provider_message_id,
        } => {
            let _ = messages::mark_status(
                &state.db,
                &outbound_id,
                DeliveryStatus::Sent,
                Some(&provider_message_id),
                None,
            )
            .await;
            TestMessageResponse {
                status: "sent".into(),
                provider_message_id: Some(provider_message_id),
                error: None,
            }
        }
        DispatchOutcome::Failed { kind, detail } => {
            warn!(business_id, %kind, detail, "test send failed");
            let _ = messages::mark_status(
                &state.db,
                &outbound_id,
                DeliveryStatus::Failed,
                None,
                Some(&detail),
            )
            .await;
            TestMessageResponse {
                status: "failed".into(),
                provider_message_id: None,
                error: Some(detail),
            }
        }
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

fn chrono_parse_ok(raw: &str) -> Option<()> {
    chrono::DateTime::parse_from_rfc3339(raw).ok().map(|_| ())
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn not_found(business_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("business '{business_id}' not found"),
        }),
    )
        .into_response()
}

fn storage_error(err: igrelay_core::IgrelayError) -> Response {
    error!(error = %err, "admin endpoint storage failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "storage unavailable".to_string(),
        }),
    )
        .into_response()
}

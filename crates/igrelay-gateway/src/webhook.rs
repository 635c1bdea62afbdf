// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook endpoints: the GET verification handshake and the POST delivery
//! handler.
//!
//! The POST handler takes the raw body bytes -- the signature is an HMAC over
//! the exact wire bytes, so the body must not pass through a JSON extractor
//! first.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::payload::{self, InboundEvent, WebhookPayload};
use crate::pipeline;
use crate::server::GatewayState;
use igrelay_storage::queries::events;

/// Query parameters of the verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub hub_mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub hub_verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub hub_challenge: Option<String>,
}

/// GET /webhook/instagram
///
/// Meta sends `hub.mode=subscribe`, `hub.verify_token`, and `hub.challenge`;
/// we echo the challenge verbatim when the token matches, else 403.
pub async fn webhook_verify(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyQuery>,
) -> impl IntoResponse {
    let verified = params.hub_mode.as_deref() == Some("subscribe")
        && params.hub_verify_token.as_deref() == Some(state.verify_token.as_str());

    match (verified, params.hub_challenge) {
        (true, Some(challenge)) => {
            info!("webhook verification handshake succeeded");
            (StatusCode::OK, challenge)
        }
        _ => {
            warn!("webhook verification handshake failed");
            (StatusCode::FORBIDDEN, "Verification failed".to_string())
        }
    }
}

/// POST /webhook/instagram
///
/// Verify -> deduplicate -> spawn the response pipeline per message. Every
/// outcome except a bad signature (403) or malformed JSON (400) is a 200 ack
/// -- telling Meta to retry only helps when a retry can succeed, and the
/// dedup ledger makes those retries safe.
pub async fn webhook_receive(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !igrelay_graph::verify_signature(state.app_secret.as_bytes(), &body, signature) {
        warn!("webhook rejected: bad or missing signature");
        return StatusCode::FORBIDDEN.into_response();
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "webhook rejected: malformed payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let mut handles = Vec::new();
    for entry in &payload.entry {
        let business =
            match igrelay_storage::queries::businesses::get_business_by_page_id(
                &state.db, &entry.id,
            )
            .await
            {
                Ok(Some(business)) => business,
                Ok(None) => {
                    // A retry cannot fix a page we do not know; ack and move on.
                    warn!(page_id = %entry.id, "webhook entry for unknown page");
                    continue;
                }
                Err(err) => {
                    error!(error = %err, "storage unavailable during business lookup");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };

        for item in &entry.messaging {
            match payload::classify(item) {
                InboundEvent::TextMessage {
                    sender_id,
                    event_id,
                    text,
                } => {
                    // The audit copy stored alongside the dedup record.
                    let raw_item =
                        serde_json::to_string(item).unwrap_or_else(|_| "{}".to_string());
                    match events::should_process(&state.db, &business.id, &event_id, &raw_item)
                        .await
                    {
                        Ok(true) => {}
                        Ok(false) => {
                            debug!(event_id, business_id = %business.id, "duplicate event skipped");
                            continue;
                        }
                        Err(err) => {
                            // Before the dedup record exists a 500 is safe:
                            // Meta redelivers and the retry starts clean.
                            error!(error = %err, "storage unavailable during dedup check");
                            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                        }
                    }

                    // Past the dedup step the work must survive a dropped
                    // client connection, so it runs as its own task. The
                    // handler still awaits it for the normal case.
                    let state = state.clone();
                    let business = business.clone();
                    handles.push(tokio::spawn(async move {
                        match pipeline::respond_to_message(&state, &business, &sender_id, &text)
                            .await
                        {
                            Ok(outcome) => {
                                debug!(?outcome, event_id, "pipeline finished");
                            }
                            Err(err) => {
                                error!(error = %err, event_id, "pipeline failed");
                            }
                        }
                    }));
                }
                InboundEvent::Echo => {
                    debug!(page_id = %entry.id, "ignoring echo of our own message");
                }
                InboundEvent::Postback { sender_id } => {
                    debug!(sender_id, "acknowledging postback without reply");
                }
                InboundEvent::Unsupported => {
                    debug!(page_id = %entry.id, "ignoring unsupported message subtype");
                }
            }
        }
    }

    for handle in handles {
        if let Err(err) = handle.await {
            error!(error = %err, "pipeline task panicked");
        }
    }

    StatusCode::OK.into_response()
}

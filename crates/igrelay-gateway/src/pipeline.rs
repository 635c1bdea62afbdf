// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The response pipeline for one deduplicated text message:
//! persist inbound -> generate reply -> dispatch -> persist outbound.
//!
//! Signature verification and the dedup insert happen in the webhook handler
//! before this code runs; the handler then spawns this as its own task, so a
//! dropped client connection never leaves a dedup record without a matching
//! MessageLog.

use igrelay_core::{
    AiErrorKind, Business, DeliveryStatus, Direction, DispatchOutcome, IgrelayError, MessageLog,
    ReplyRequest,
};
use igrelay_storage::database::now_iso;
use igrelay_storage::queries::{customers, messages};
use tracing::{info, warn};

use crate::server::GatewayState;

/// Reply-generation policy knobs, from `[openai]` config.
#[derive(Debug, Clone)]
pub struct AiPolicy {
    /// Static reply substituted when the provider rejects the content.
    pub fallback_reply: String,
    /// Whether transient provider failures also fall back instead of
    /// recording a failure.
    pub fallback_on_transient: bool,
    /// Number of recent exchanges in the context window.
    pub history_limit: usize,
}

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// AI is disabled for the business; inbound persisted and marked skipped.
    AiDisabled,
    /// Reply generation failed and no fallback applied; inbound marked failed.
    ReplyFailed,
    /// Reply dispatched (or dispatch failed terminally); both rows persisted.
    Done { delivered: bool },
}

/// Run the pipeline for one verified, deduplicated text message.
pub async fn respond_to_message(
    state: &GatewayState,
    business: &Business,
    sender_id: &str,
    text: &str,
) -> Result<PipelineOutcome, IgrelayError> {
    let db = &state.db;

    let customer = customers::upsert_customer(db, &business.id, sender_id, None).await?;

    let inbound_id = uuid::Uuid::new_v4().to_string();
    let now = now_iso();
    messages::insert_message(
        db,
        &MessageLog {
            id: inbound_id.clone(),
            business_id: business.id.clone(),
            customer_id: Some(customer.id.clone()),
            direction: Direction::Inbound,
            text: text.to_string(),
            status: DeliveryStatus::Pending,
            provider_message_id: None,
            error_detail: None,
            in_reply_to: None,
            created_at: now.clone(),
            updated_at: now,
        },
    )
    .await?;

    if !business.ai_enabled {
        info!(business_id = %business.id, "AI disabled, skipping reply");
        messages::mark_status(db, &inbound_id, DeliveryStatus::Skipped, None, None).await?;
        return Ok(PipelineOutcome::AiDisabled);
    }

    let history = messages::recent_history(
        db,
        &business.id,
        &customer.id,
        state.ai.history_limit * 2,
        Some(&inbound_id),
    )
    .await?;

    let reply = match state
        .responder
        .generate_reply(ReplyRequest {
            business_name: business.name.clone(),
            system_prompt: business.system_prompt.clone(),
            history,
            message_text: text.to_string(),
        })
        .await
    {
        Ok(reply) => reply,
        Err(err) => match err.ai_kind() {
            Some(AiErrorKind::ContentRejected) => {
                info!(business_id = %business.id, "provider rejected content, using fallback reply");
                state.ai.fallback_reply.clone()
            }
            Some(kind) if kind.is_transient() && state.ai.fallback_on_transient => {
                warn!(business_id = %business.id, %kind, "transient provider failure, using fallback reply");
                state.ai.fallback_reply.clone()
            }
            _ => {
                warn!(business_id = %business.id, error = %err, "reply generation failed");
                messages::mark_status(
                    db,
                    &inbound_id,
                    DeliveryStatus::Failed,
                    None,
                    Some(&err.to_string()),
                )
                .await?;
                return Ok(PipelineOutcome::ReplyFailed);
            }
        },
    };

    // Persist the outbound row before dispatching so every attempt is
    // observable, then transition it to its terminal status.
    let outbound_id = uuid::Uuid::new_v4().to_string();
    let now = now_iso();
    messages::insert_message(
        db,
        &MessageLog {
            id: outbound_id.clone(),
            business_id: business.id.clone(),
            customer_id: Some(customer.id.clone()),
            direction: Direction::Outbound,
            text: reply.clone(),
            status: DeliveryStatus::Pending,
            provider_message_id: None,
            error_detail: None,
            in_reply_to: Some(inbound_id.clone()),
            created_at: now.clone(),
            updated_at: now,
        },
    )
    .await?;

    let token = state.tokens.get_valid_token(db, &business.id).await?;
    let outcome = state.dispatcher.dispatch(&token, sender_id, &reply).await;

    let delivered = match &outcome {
        DispatchOutcome::Sent {
            provider_message_id,
        } => {
            messages::mark_status(
                db,
                &outbound_id,
                DeliveryStatus::Sent,
                Some(provider_message_id),
                None,
            )
            .await?;
            true
        }
        DispatchOutcome::Failed { kind, detail } => {
            warn!(business_id = %business.id, %kind, detail, "outbound dispatch failed");
            messages::mark_status(db, &outbound_id, DeliveryStatus::Failed, None, Some(detail))
                .await?;
            false
        }
    };

    let inbound_status = if delivered {
        DeliveryStatus::Sent
    } else {
        DeliveryStatus::Failed
    };
    let inbound_detail = (!delivered).then(|| "reply dispatch failed".to_string());
    messages::mark_status(
        db,
        &inbound_id,
        inbound_status,
        None,
        inbound_detail.as_deref(),
    )
    .await?;

    Ok(PipelineOutcome::Done { delivered })
}

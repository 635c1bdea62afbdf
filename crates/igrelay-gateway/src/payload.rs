// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook payload parsing.
//!
//! Meta's payload shapes vary by event subtype, so parsing happens at the
//! boundary into a tagged variant: text message, postback, echo, or
//! unsupported. Unsupported subtypes are acknowledged and produce no
//! MessageLog -- never a crash.

use serde::{Deserialize, Serialize};

/// Top-level webhook POST body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

/// One page's batch of messaging events. `id` is the Instagram page id.
#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(default)]
    pub messaging: Vec<MessagingItem>,
}

/// One messaging event. Exactly one of the subtype fields is normally set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingItem {
    pub sender: Option<Actor>,
    pub recipient: Option<Actor>,
    pub timestamp: Option<i64>,
    pub message: Option<MessagePayload>,
    pub postback: Option<PostbackPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Meta's message id; globally unique per page and the dedup key.
    pub mid: Option<String>,
    pub text: Option<String>,
    /// Set on reflections of our own outbound messages.
    #[serde(default)]
    pub is_echo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostbackPayload {
    pub title: Option<String>,
    pub payload: Option<String>,
}

/// Tagged classification of one messaging item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A customer text message the pipeline responds to.
    TextMessage {
        sender_id: String,
        event_id: String,
        text: String,
    },
    /// A structured button postback. Acknowledged, no MessageLog.
    Postback { sender_id: String },
    /// Our own outbound message reflected back. Acknowledged, ignored.
    Echo,
    /// Attachment-only messages, reactions, anything without the fields the
    /// pipeline needs. Acknowledged, no MessageLog.
    Unsupported,
}

/// Classify one messaging item into its pipeline-relevant variant.
pub fn classify(item: &MessagingItem) -> InboundEvent {
    if let Some(message) = &item.message {
        if message.is_echo {
            return InboundEvent::Echo;
        }
        if let (Some(sender), Some(mid), Some(text)) =
            (&item.sender, &message.mid, &message.text)
        {
            return InboundEvent::TextMessage {
                sender_id: sender.id.clone(),
                event_id: mid.clone(),
                text: text.clone(),
            };
        }
        return InboundEvent::Unsupported;
    }
    if item.postback.is_some() {
        if let Some(sender) = &item.sender {
            return InboundEvent::Postback {
                sender_id: sender.id.clone(),
            };
        }
    }
    InboundEvent::Unsupported
}

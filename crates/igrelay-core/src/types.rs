// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types shared across the Igrelay crates.
//!
//! Timestamps are ISO-8601 UTC strings with millisecond precision, matching
//! what SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` produces, so rows
//! can be ordered lexicographically on the read side.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A tenant: one connected Instagram business account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    /// Instagram page id as it appears in webhook `entry[].id`.
    pub instagram_page_id: String,
    /// Page access token authorizing sends. At most one per business.
    pub page_access_token: Option<String>,
    /// RFC 3339 expiry of the page token, if the OAuth flow reported one.
    pub token_expires_at: Option<String>,
    /// When false the pipeline stops after persisting the inbound message.
    pub ai_enabled: bool,
    /// Business-specific system prompt for the responder.
    pub system_prompt: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A remote Instagram user, scoped to one business.
///
/// Created lazily on first inbound message; `(business_id, instagram_user_id)`
/// is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub business_id: String,
    pub instagram_user_id: String,
    pub display_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A single inbound or outbound message with its delivery bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLog {
    pub id: String,
    pub business_id: String,
    pub customer_id: Option<String>,
    pub direction: Direction,
    pub text: String,
    pub status: DeliveryStatus,
    /// Message id assigned by the Graph API on a successful send.
    pub provider_message_id: Option<String>,
    /// Human-readable failure detail for operator visibility.
    pub error_detail: Option<String>,
    /// Causal link: the inbound row that triggered this outbound row.
    /// `None` for inbound rows and admin-triggered test sends.
    pub in_reply_to: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Message direction relative to the business.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Delivery status of a [`MessageLog`] row.
///
/// `Sent` and `Failed` are terminal; rows never leave a terminal status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
    Skipped,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Sent | DeliveryStatus::Failed)
    }
}

/// Result of a token lookup for a business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// A token is on record and not within the expiry margin.
    Valid(String),
    /// No credentials recorded (never connected, or cleared by an admin).
    Missing,
    /// Credentials on record but past (or within the margin of) their expiry.
    Expired,
}

/// One prior turn of a conversation, used to build the AI context window.
#[derive(Debug, Clone)]
pub struct HistoryTurn {
    pub direction: Direction,
    pub text: String,
}

/// Everything the reply provider needs to produce a response.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub business_name: String,
    /// Business-configured system prompt; the provider supplies a default
    /// mentioning the business name when absent.
    pub system_prompt: Option<String>,
    /// Most recent prior turns, oldest first. Already bounded by the caller.
    pub history: Vec<HistoryTurn>,
    pub message_text: String,
}

/// Terminal outcome of an outbound dispatch, used to finalize the MessageLog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent {
        provider_message_id: String,
    },
    Failed {
        kind: crate::error::SendErrorKind,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn direction_round_trips_through_strings() {
        assert_eq!(Direction::Inbound.to_string(), "inbound");
        assert_eq!(Direction::from_str("outbound").unwrap(), Direction::Outbound);
        assert!(Direction::from_str("sideways").is_err());
    }

    #[test]
    fn delivery_status_round_trips_through_strings() {
        for (status, text) in [
            (DeliveryStatus::Pending, "pending"),
            (DeliveryStatus::Sent, "sent"),
            (DeliveryStatus::Failed, "failed"),
            (DeliveryStatus::Skipped, "skipped"),
        ] {
            assert_eq!(status.to_string(), text);
            assert_eq!(DeliveryStatus::from_str(text).unwrap(), status);
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(DeliveryStatus::Sent.is_terminal());
        assert!(DeliveryStatus::Failed.is_terminal());
        assert!(!DeliveryStatus::Pending.is_terminal());
        assert!(!DeliveryStatus::Skipped.is_terminal());
    }
}

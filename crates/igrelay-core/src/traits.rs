// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the two external seams: the AI provider and the
//! messaging transport. Both are object-safe so the pipeline and dispatcher
//! can be exercised with mocks in tests.

use async_trait::async_trait;

use crate::error::{IgrelayError, SendError};
use crate::types::ReplyRequest;

/// Generates a reply to a customer message.
///
/// Implementations issue a single call with an explicit request timeout and
/// classify failures via [`crate::error::AiErrorKind`] on the returned
/// `Provider` error. They must not retry internally; the webhook latency
/// budget belongs to the caller.
#[async_trait]
pub trait ReplyProvider: Send + Sync {
    async fn generate_reply(&self, request: ReplyRequest) -> Result<String, IgrelayError>;
}

/// Delivers one text message to a recipient on behalf of a page.
///
/// Returns the provider-assigned message id on success. One call is one
/// attempt: retry/backoff lives in the dispatcher, not the transport.
#[async_trait]
pub trait SendTransport: Send + Sync {
    async fn send_text(
        &self,
        page_token: &str,
        recipient_id: &str,
        text: &str,
    ) -> Result<String, SendError>;
}

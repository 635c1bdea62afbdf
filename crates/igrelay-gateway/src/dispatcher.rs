// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound dispatch with bounded retry.
//!
//! Wraps a [`SendTransport`] in the configured [`RetryPolicy`]: transient
//! failures (timeout, rate limit, 5xx) are retried with capped exponential
//! backoff, permanent ones fail immediately. A missing or expired token
//! fails the dispatch before any network call.

use std::sync::Arc;

use igrelay_core::{
    DispatchOutcome, RetryPolicy, SendError, SendErrorKind, SendTransport, TokenState,
};
use tracing::{info, warn};

/// Sends replies through the transport, applying the retry policy and the
/// token precondition.
pub struct OutboundDispatcher {
    transport: Arc<dyn SendTransport>,
    policy: RetryPolicy,
}

impl OutboundDispatcher {
    pub fn new(transport: Arc<dyn SendTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Attempt delivery. The caller supplies the current token state; an
    /// invalid one short-circuits to `Failed` with zero transport calls.
    pub async fn dispatch(
        &self,
        token: &TokenState,
        recipient_id: &str,
        text: &str,
    ) -> DispatchOutcome {
        let page_token = match token {
            TokenState::Valid(token) => token,
            TokenState::Missing => {
                return failed(SendError::new(
                    SendErrorKind::TokenInvalid,
                    "no page access token on record",
                ));
            }
            TokenState::Expired => {
                return failed(SendError::new(
                    SendErrorKind::TokenInvalid,
                    "page access token expired; reconnect required",
                ));
            }
        };

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.send_text(page_token, recipient_id, text).await {
                Ok(provider_message_id) => {
                    if attempt > 1 {
                        info!(attempt, recipient_id, "send succeeded after retry");
                    }
                    return DispatchOutcome::Sent {
                        provider_message_id,
                    };
                }
                Err(error) => {
                    if !error.kind.is_transient() || attempt >= max_attempts {
                        warn!(
                            attempt,
                            kind = %error.kind,
                            detail = %error.detail,
                            recipient_id,
                            "send failed terminally"
                        );
                        return failed(error);
                    }
                    let delay = self.policy.delay_for(attempt, error.retry_after);
                    warn!(
                        attempt,
                        kind = %error.kind,
                        delay_ms = delay.as_millis() as u64,
                        recipient_id,
                        "transient send failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn failed(error: SendError) -> DispatchOutcome {
    DispatchOutcome::Failed {
        kind: error.kind,
        detail: error.to_string(),
    }
}

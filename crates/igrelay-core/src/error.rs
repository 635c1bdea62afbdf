// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Igrelay gateway.

use thiserror::Error;

/// The primary error type used across all Igrelay crates.
#[derive(Debug, Error)]
pub enum IgrelayError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Instagram Graph API errors outside the send path (OAuth exchange, subscription).
    #[error("graph api error: {message}")]
    Graph {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// AI provider errors, classified for the pipeline's fallback policy.
    #[error("provider error ({kind}): {message}")]
    Provider { kind: AiErrorKind, message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IgrelayError {
    /// The AI failure class carried by a `Provider` error, if this is one.
    pub fn ai_kind(&self) -> Option<AiErrorKind> {
        match self {
            IgrelayError::Provider { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Classification of AI provider failures.
///
/// The pipeline never retries these inline; the class decides whether a
/// static fallback reply is substituted or the failure is recorded as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AiErrorKind {
    /// Provider returned 429.
    RateLimited,
    /// Provider returned 5xx or was unreachable.
    ProviderUnavailable,
    /// Provider declined to answer (content filter / policy).
    ContentRejected,
    /// The request timed out.
    Timeout,
}

impl AiErrorKind {
    /// True for failures that a background retry could plausibly resolve.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AiErrorKind::RateLimited | AiErrorKind::ProviderUnavailable | AiErrorKind::Timeout
        )
    }
}

/// A failed attempt to deliver an outbound message.
///
/// Carries the classification used by the dispatcher's retry predicate and a
/// human-readable detail persisted on the MessageLog row.
#[derive(Debug, Clone, Error)]
#[error("send failed ({kind}): {detail}")]
pub struct SendError {
    pub kind: SendErrorKind,
    pub detail: String,
    /// Rate-limit hint from the provider, honored when longer than the backoff.
    pub retry_after: Option<std::time::Duration>,
}

impl SendError {
    pub fn new(kind: SendErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: std::time::Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

/// Classification of outbound send failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SendErrorKind {
    /// Request timed out.
    Timeout,
    /// Provider asked us to slow down (429 or Graph rate-limit codes).
    RateLimited,
    /// Provider-side failure (5xx or unreachable).
    ServerError,
    /// The recipient id does not resolve to a messageable user.
    InvalidRecipient,
    /// The page token was rejected or the permission was revoked.
    PermissionRevoked,
    /// No valid page access token on record; no network call was attempted.
    TokenInvalid,
    /// Anything the Graph error taxonomy does not cover.
    Other,
}

impl SendErrorKind {
    /// Retry predicate for the dispatcher: only transient classes are retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SendErrorKind::Timeout | SendErrorKind::RateLimited | SendErrorKind::ServerError
        )
    }
}

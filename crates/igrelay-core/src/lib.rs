// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types for the Igrelay messaging gateway.
//!
//! Defines the error taxonomy, domain model types, the adapter traits at the
//! AI-provider and Graph-API seams, and the retry policy value object shared
//! by the outbound dispatcher.

pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::{AiErrorKind, IgrelayError, SendError, SendErrorKind};
pub use retry::RetryPolicy;
pub use traits::{ReplyProvider, SendTransport};
pub use types::*;

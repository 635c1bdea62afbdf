// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instagram Graph API adapter for the Igrelay gateway.
//!
//! Covers the three Graph-facing concerns: webhook signature verification
//! (`X-Hub-Signature-256`), the outbound text-message transport, and the
//! OAuth token-exchange helpers used by the admin connect flow.

pub mod client;
pub mod oauth;
pub mod signature;

pub use client::GraphClient;
pub use signature::verify_signature;

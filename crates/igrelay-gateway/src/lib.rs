// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP webhook gateway for the Igrelay messaging pipeline.
//!
//! Receives Instagram webhook deliveries, verifies and deduplicates them,
//! and drives the persist -> respond -> dispatch pipeline. Every terminal
//! state produces a fast, well-formed HTTP acknowledgment -- Meta treats a
//! slow or erroring endpoint as a delivery failure and retries aggressively.

pub mod admin;
pub mod dispatcher;
pub mod payload;
pub mod pipeline;
pub mod server;
pub mod webhook;

pub use dispatcher::OutboundDispatcher;
pub use pipeline::AiPolicy;
pub use server::{build_router, start_server, GatewayState};

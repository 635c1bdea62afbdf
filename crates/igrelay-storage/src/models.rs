// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `igrelay-core::types` for use across
//! crate boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use igrelay_core::types::{
    Business, Customer, DeliveryStatus, Direction, HistoryTurn, MessageLog, TokenState,
};

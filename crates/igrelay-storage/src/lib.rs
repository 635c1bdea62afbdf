// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Igrelay gateway.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query modules for
//! businesses, customers, the message log, and the webhook dedup ledger.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod tokens;

#[cfg(test)]
pub(crate) mod test_support;

pub use database::Database;
pub use models::*;
pub use tokens::TokenStore;

// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each accepts `&Database` and runs on the single
//! writer thread.

pub mod businesses;
pub mod customers;
pub mod events;
pub mod messages;

// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for the storage test suites.

use crate::database::{now_iso, Database};
use crate::models::Business;

/// Open a fresh database in a temp directory.
pub(crate) async fn setup_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
    (db, dir)
}

/// A business row with AI enabled and no token.
pub(crate) fn make_business(id: &str, page_id: &str) -> Business {
    Business {
        id: id.to_string(),
        name: format!("shop-{id}"),
        instagram_page_id: page_id.to_string(),
        page_access_token: None,
        token_expires_at: None,
        ai_enabled: true,
        system_prompt: None,
        created_at: now_iso(),
        updated_at: now_iso(),
    }
}

// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business (tenant) CRUD and token column operations.

use igrelay_core::IgrelayError;
use rusqlite::params;

use crate::database::Database;
use crate::models::Business;

fn read_business(row: &rusqlite::Row<'_>) -> rusqlite::Result<Business> {
    Ok(Business {
        id: row.get(0)?,
        name: row.get(1)?,
        instagram_page_id: row.get(2)?,
        page_access_token: row.get(3)?,
        token_expires_at: row.get(4)?,
        ai_enabled: row.get::<_, i64>(5)? != 0,
        system_prompt: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const BUSINESS_COLUMNS: &str = "id, name, instagram_page_id, page_access_token, \
     token_expires_at, ai_enabled, system_prompt, created_at, updated_at";

/// Insert a new business.
pub async fn insert_business(db: &Database, business: &Business) -> Result<(), IgrelayError> {
    let business = business.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO businesses (id, name, instagram_page_id, page_access_token,
                     token_expires_at, ai_enabled, system_prompt, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    business.id,
                    business.name,
                    business.instagram_page_id,
                    business.page_access_token,
                    business.token_expires_at,
                    business.ai_enabled as i64,
                    business.system_prompt,
                    business.created_at,
                    business.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a business by id.
pub async fn get_business(db: &Database, id: &str) -> Result<Option<Business>, IgrelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], read_business)?;
            rows.next().transpose()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a business by the Instagram page id carried in webhook entries.
pub async fn get_business_by_page_id(
    db: &Database,
    page_id: &str,
) -> Result<Option<Business>, IgrelayError> {
    let page_id = page_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE instagram_page_id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![page_id], read_business)?;
            rows.next().transpose()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrite the page credentials in one statement.
///
/// Returns false when no business with that id exists.
pub async fn record_token(
    db: &Database,
    business_id: &str,
    token: &str,
    expires_at: Option<&str>,
) -> Result<bool, IgrelayError> {
    let business_id = business_id.to_string();
    let token = token.to_string();
    let expires_at = expires_at.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE businesses
                 SET page_access_token = ?2, token_expires_at = ?3,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![business_id, token, expires_at],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove the page credentials (admin-triggered disconnect).
///
/// Returns false when no business with that id exists.
pub async fn clear_token(db: &Database, business_id: &str) -> Result<bool, IgrelayError> {
    let business_id = business_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE businesses
                 SET page_access_token = NULL, token_expires_at = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![business_id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

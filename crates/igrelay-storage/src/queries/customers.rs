// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer records, created lazily on first inbound message.

use igrelay_core::IgrelayError;
use rusqlite::params;

use crate::database::{now_iso, Database};
use crate::models::Customer;

fn read_customer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        business_id: row.get(1)?,
        instagram_user_id: row.get(2)?,
        display_name: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Insert-or-update a customer keyed by `(business_id, instagram_user_id)`
/// and return the current row.
///
/// A later display name wins; an absent one never erases a recorded one.
pub async fn upsert_customer(
    db: &Database,
    business_id: &str,
    instagram_user_id: &str,
    display_name: Option<&str>,
) -> Result<Customer, IgrelayError> {
    let candidate_id = uuid::Uuid::new_v4().to_string();
    let business_id = business_id.to_string();
    let instagram_user_id = instagram_user_id.to_string();
    let display_name = display_name.map(str::to_string);
    let now = now_iso();

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO customers
                     (id, business_id, instagram_user_id, display_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT (business_id, instagram_user_id) DO UPDATE SET
                     display_name = COALESCE(excluded.display_name, customers.display_name),
                     updated_at = excluded.updated_at",
                params![candidate_id, business_id, instagram_user_id, display_name, now],
            )?;
            conn.query_row(
                "SELECT id, business_id, instagram_user_id, display_name, created_at, updated_at
                 FROM customers
                 WHERE business_id = ?1 AND instagram_user_id = ?2",
                params![business_id, instagram_user_id],
                read_customer,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a customer by id.
pub async fn get_customer(db: &Database, id: &str) -> Result<Option<Customer>, IgrelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, business_id, instagram_user_id, display_name, created_at, updated_at
                 FROM customers WHERE id = ?1",
            )?;
            let mut rows = stmt.query_map(params![id], read_customer)?;
            rows.next().transpose()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

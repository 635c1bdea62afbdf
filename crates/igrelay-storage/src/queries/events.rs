// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook event deduplication ledger.
//!
//! Meta re-delivers webhook events aggressively when an endpoint is slow or
//! errors, so processing must be at-most-once per `(business, event id)`.

use igrelay_core::IgrelayError;
use rusqlite::params;

use crate::database::Database;

/// Atomically record `(business_id, event_id)` with its raw payload and
/// report whether this call was the first to do so.
///
/// A single `INSERT OR IGNORE` on the writer thread is the whole check:
/// exactly one caller observes `changes() == 1`, every other caller --
/// including concurrent ones -- observes 0. There is no separate
/// check-then-insert to race. The stored payload is never mutated; it is
/// the audit record for the retention window.
pub async fn should_process(
    db: &Database,
    business_id: &str,
    event_id: &str,
    payload: &str,
) -> Result<bool, IgrelayError> {
    let business_id = business_id.to_string();
    let event_id = event_id.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO webhook_events (business_id, event_id, payload)
                 VALUES (?1, ?2, ?3)",
                params![business_id, event_id, payload],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete ledger rows older than the retention window. Returns the number of
/// rows removed.
///
/// Runs on a background interval, never on the synchronous webhook path.
pub async fn prune_older_than(db: &Database, hours: u64) -> Result<u64, IgrelayError> {
    let modifier = format!("-{hours} hours");
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM webhook_events
                 WHERE received_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)",
                params![modifier],
            )?;
            Ok(deleted as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of ledger rows on record (test and operator visibility).
pub async fn count(db: &Database) -> Result<i64, IgrelayError> {
    db.connection()
        .call(|conn| {
            conn.query_row("SELECT COUNT(*) FROM webhook_events", [], |row| row.get(0))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn first_call_true_then_false() {
        let (db, _dir) = setup_db().await;

        assert!(should_process(&db, "biz-1", "mid.1", "{}").await.unwrap());
        assert!(!should_process(&db, "biz-1", "mid.1", "{}").await.unwrap());
        assert!(!should_process(&db, "biz-1", "mid.1", "{}").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn event_ids_are_scoped_per_business() {
        let (db, _dir) = setup_db().await;

        assert!(should_process(&db, "biz-1", "mid.1", "{}").await.unwrap());
        // The same external id from a different business is a new event.
        assert!(should_process(&db, "biz-2", "mid.1", "{}").await.unwrap());
        assert!(!should_process(&db, "biz-2", "mid.1", "{}").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_callers_see_exactly_one_true() {
        let (db, _dir) = setup_db().await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                should_process(&db, "biz-1", "mid.concurrent", "{}").await.unwrap()
            }));
        }

        let mut trues = 0;
        for handle in handles {
            if handle.await.unwrap() {
                trues += 1;
            }
        }
        assert_eq!(trues, 1, "exactly one concurrent caller may win");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn prune_removes_only_old_rows() {
        let (db, _dir) = setup_db().await;

        should_process(&db, "biz-1", "mid.old", "{}").await.unwrap();
        should_process(&db, "biz-1", "mid.new", "{}").await.unwrap();

        // Backdate one row past the retention window.
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE webhook_events
                     SET received_at = '2020-01-01T00:00:00.000Z'
                     WHERE event_id = 'mid.old'",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let deleted = prune_older_than(&db, 48).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(count(&db).await.unwrap(), 1);

        // The pruned id becomes processable again, which is why the
        // retention window must exceed the provider's retry window.
        assert!(should_process(&db, "biz-1", "mid.old", "{}").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn first_payload_wins_and_is_retained() {
        let (db, _dir) = setup_db().await;

        should_process(&db, "biz-1", "mid.1", r#"{"text":"original"}"#)
            .await
            .unwrap();
        // A redelivery with a different body must not overwrite the audit record.
        should_process(&db, "biz-1", "mid.1", r#"{"text":"tampered"}"#)
            .await
            .unwrap();

        let stored: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row(
                    "SELECT payload FROM webhook_events WHERE event_id = 'mid.1'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(stored, r#"{"text":"original"}"#);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn prune_on_empty_ledger_is_a_noop() {
        let (db, _dir) = setup_db().await;
        assert_eq!(prune_older_than(&db, 48).await.unwrap(), 0);
        db.close().await.unwrap();
    }
}

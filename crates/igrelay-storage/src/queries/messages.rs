// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations.
//!
//! Rows are appended with caller-assigned timestamps and ordered on the read
//! side by `created_at`; there is no write-side ordering lock. Terminal rows
//! (sent/failed) are immutable -- `mark_status` refuses to touch them.

use igrelay_core::IgrelayError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{DeliveryStatus, Direction, HistoryTurn, MessageLog};

fn read_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageLog> {
    let direction: String = row.get(3)?;
    let status: String = row.get(5)?;
    Ok(MessageLog {
        id: row.get(0)?,
        business_id: row.get(1)?,
        customer_id: row.get(2)?,
        direction: direction.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        text: row.get(4)?,
        status: status.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
        provider_message_id: row.get(6)?,
        error_detail: row.get(7)?,
        in_reply_to: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, business_id, customer_id, direction, text, status, \
     provider_message_id, error_detail, in_reply_to, created_at, updated_at";

/// Append a message log row.
pub async fn insert_message(db: &Database, msg: &MessageLog) -> Result<(), IgrelayError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO message_log
                     (id, business_id, customer_id, direction, text, status,
                      provider_message_id, error_detail, in_reply_to, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    msg.id,
                    msg.business_id,
                    msg.customer_id,
                    msg.direction.to_string(),
                    msg.text,
                    msg.status.to_string(),
                    msg.provider_message_id,
                    msg.error_detail,
                    msg.in_reply_to,
                    msg.created_at,
                    msg.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a message by id.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<MessageLog>, IgrelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM message_log WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], read_message)?;
            rows.next().transpose()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All messages for a business in chronological order.
pub async fn messages_for_business(
    db: &Database,
    business_id: &str,
) -> Result<Vec<MessageLog>, IgrelayError> {
    let business_id = business_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM message_log
                 WHERE business_id = ?1
                 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![business_id], read_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The most recent turns of one conversation, oldest first, for the AI
/// context window. `exclude_id` leaves out the row being processed.
pub async fn recent_history(
    db: &Database,
    business_id: &str,
    customer_id: &str,
    max_turns: usize,
    exclude_id: Option<&str>,
) -> Result<Vec<HistoryTurn>, IgrelayError> {
    let business_id = business_id.to_string();
    let customer_id = customer_id.to_string();
    let exclude_id = exclude_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT direction, text FROM message_log
                 WHERE business_id = ?1 AND customer_id = ?2
                   AND (?3 IS NULL OR id != ?3)
                 ORDER BY created_at DESC
                 LIMIT ?4",
            )?;
            let rows = stmt.query_map(
                params![business_id, customer_id, exclude_id, max_turns as i64],
                |row| {
                    let direction: String = row.get(0)?;
                    Ok(HistoryTurn {
                        direction: direction.parse::<Direction>().map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                0,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?,
                        text: row.get(1)?,
                    })
                },
            )?;
            let mut turns = Vec::new();
            for row in rows {
                turns.push(row?);
            }
            turns.reverse();
            Ok(turns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Transition a row's delivery status, setting the provider message id and
/// error detail when given.
///
/// Returns false when the row does not exist or is already terminal
/// (sent/failed) -- terminal rows are immutable.
pub async fn mark_status(
    db: &Database,
    id: &str,
    status: DeliveryStatus,
    provider_message_id: Option<&str>,
    error_detail: Option<&str>,
) -> Result<bool, IgrelayError> {
    let id = id.to_string();
    let status = status.to_string();
    let provider_message_id = provider_message_id.map(str::to_string);
    let error_detail = error_detail.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE message_log
                 SET status = ?2,
                     provider_message_id = COALESCE(?3, provider_message_id),
                     error_detail = COALESCE(?4, error_detail),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status NOT IN ('sent', 'failed')",
                params![id, status, provider_message_id, error_detail],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count message rows for a business (idempotence checks, admin views).
pub async fn count_for_business(db: &Database, business_id: &str) -> Result<i64, IgrelayError> {
    let business_id = business_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM message_log WHERE business_id = ?1",
                params![business_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::now_iso;
    use crate::queries::businesses::insert_business;
    use crate::queries::customers::upsert_customer;
    use crate::test_support::{make_business, setup_db};

    async fn setup() -> (Database, String, tempfile::TempDir) {
        let (db, dir) = setup_db().await;
        insert_business(&db, &make_business("biz-1", "page-100"))
            .await
            .unwrap();
        let customer = upsert_customer(&db, "biz-1", "ig-user-9", None).await.unwrap();
        (db, customer.id, dir)
    }

    fn make_msg(
        id: &str,
        customer_id: &str,
        direction: Direction,
        text: &str,
        timestamp: &str,
    ) -> MessageLog {
        MessageLog {
            id: id.to_string(),
            business_id: "biz-1".to_string(),
            customer_id: Some(customer_id.to_string()),
            direction,
            text: text.to_string(),
            status: DeliveryStatus::Pending,
            provider_message_id: None,
            error_detail: None,
            in_reply_to: None,
            created_at: timestamp.to_string(),
            updated_at: timestamp.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_read_back_in_order() {
        let (db, customer_id, _dir) = setup().await;

        let m1 = make_msg("m1", &customer_id, Direction::Inbound, "hi", "2026-01-01T00:00:01.000Z");
        let m2 = make_msg(
            "m2",
            &customer_id,
            Direction::Outbound,
            "hello!",
            "2026-01-01T00:00:02.000Z",
        );
        insert_message(&db, &m2).await.unwrap();
        insert_message(&db, &m1).await.unwrap();

        let messages = messages_for_business(&db, "biz-1").await.unwrap();
        assert_eq!(messages.len(), 2);
        // Insert order does not matter; read side sorts by created_at.
        assert_eq!(messages[0].id, "m1");
        assert_eq!(messages[1].id, "m2");
        assert_eq!(messages[0].direction, Direction::Inbound);
        assert_eq!(messages[1].direction, Direction::Outbound);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn causal_link_round_trips() {
        let (db, customer_id, _dir) = setup().await;

        let inbound = make_msg(
            "in-1",
            &customer_id,
            Direction::Inbound,
            "price?",
            "2026-01-01T00:00:01.000Z",
        );
        insert_message(&db, &inbound).await.unwrap();

        let mut outbound = make_msg(
            "out-1",
            &customer_id,
            Direction::Outbound,
            "It's $20.",
            "2026-01-01T00:00:02.000Z",
        );
        outbound.in_reply_to = Some("in-1".to_string());
        insert_message(&db, &outbound).await.unwrap();

        let found = get_message(&db, "out-1").await.unwrap().unwrap();
        assert_eq!(found.in_reply_to.as_deref(), Some("in-1"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_status_transitions_and_freezes_terminal_rows() {
        let (db, customer_id, _dir) = setup().await;

        let msg = make_msg(
            "m1",
            &customer_id,
            Direction::Outbound,
            "reply",
            &now_iso(),
        );
        insert_message(&db, &msg).await.unwrap();

        let changed = mark_status(&db, "m1", DeliveryStatus::Sent, Some("mid.777"), None)
            .await
            .unwrap();
        assert!(changed);

        let found = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(found.status, DeliveryStatus::Sent);
        assert_eq!(found.provider_message_id.as_deref(), Some("mid.777"));

        // Terminal rows are immutable.
        let changed = mark_status(&db, "m1", DeliveryStatus::Failed, None, Some("late error"))
            .await
            .unwrap();
        assert!(!changed);
        let found = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(found.status, DeliveryStatus::Sent);
        assert!(found.error_detail.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_status_failed_records_error_detail() {
        let (db, customer_id, _dir) = setup().await;

        insert_message(
            &db,
            &make_msg("m1", &customer_id, Direction::Outbound, "reply", &now_iso()),
        )
        .await
        .unwrap();

        mark_status(
            &db,
            "m1",
            DeliveryStatus::Failed,
            None,
            Some("send failed (token_invalid): token expired"),
        )
        .await
        .unwrap();

        let found = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(found.status, DeliveryStatus::Failed);
        assert!(found.error_detail.unwrap().contains("token_invalid"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recent_history_is_windowed_and_oldest_first() {
        let (db, customer_id, _dir) = setup().await;

        for i in 0..6 {
            let direction = if i % 2 == 0 {
                Direction::Inbound
            } else {
                Direction::Outbound
            };
            insert_message(
                &db,
                &make_msg(
                    &format!("m{i}"),
                    &customer_id,
                    direction,
                    &format!("turn {i}"),
                    &format!("2026-01-01T00:00:0{i}.000Z"),
                ),
            )
            .await
            .unwrap();
        }

        let turns = recent_history(&db, "biz-1", &customer_id, 4, None)
            .await
            .unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].text, "turn 2");
        assert_eq!(turns[3].text, "turn 5");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recent_history_excludes_the_row_being_processed() {
        let (db, customer_id, _dir) = setup().await;

        insert_message(
            &db,
            &make_msg(
                "old",
                &customer_id,
                Direction::Inbound,
                "earlier",
                "2026-01-01T00:00:01.000Z",
            ),
        )
        .await
        .unwrap();
        insert_message(
            &db,
            &make_msg(
                "current",
                &customer_id,
                Direction::Inbound,
                "now",
                "2026-01-01T00:00:02.000Z",
            ),
        )
        .await
        .unwrap();

        let turns = recent_history(&db, "biz-1", &customer_id, 10, Some("current"))
            .await
            .unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "earlier");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn count_for_business_scopes_by_tenant() {
        let (db, customer_id, _dir) = setup().await;
        insert_business(&db, &make_business("biz-2", "page-200"))
            .await
            .unwrap();

        insert_message(
            &db,
            &make_msg("m1", &customer_id, Direction::Inbound, "hi", &now_iso()),
        )
        .await
        .unwrap();

        assert_eq!(count_for_business(&db, "biz-1").await.unwrap(), 1);
        assert_eq!(count_for_business(&db, "biz-2").await.unwrap(), 0);

        db.close().await.unwrap();
    }
}

// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Page access token lifecycle.
//!
//! The store reports state; it never refreshes tokens itself. Re-auth is an
//! external OAuth flow -- callers decide whether to degrade (fail the send)
//! or surface the business for manual reconnection. Every lookup reads the
//! current row, so `record_token`/`clear_token` need no cache invalidation.

use chrono::{DateTime, Duration, Utc};
use igrelay_core::{Business, IgrelayError, TokenState};

use crate::database::Database;
use crate::queries::businesses;

/// Per-business token store with an expiry safety margin.
#[derive(Debug, Clone)]
pub struct TokenStore {
    margin: Duration,
}

impl TokenStore {
    pub fn new(expiry_margin_secs: i64) -> Self {
        Self {
            margin: Duration::seconds(expiry_margin_secs),
        }
    }

    /// Classify a business's credentials at `now`.
    ///
    /// A token is expired once `now >= expires_at - margin`. A token without
    /// a recorded expiry never expires by time; an unparseable expiry is
    /// treated as expired rather than trusted.
    pub fn evaluate_at(&self, business: &Business, now: DateTime<Utc>) -> TokenState {
        let Some(token) = business.page_access_token.as_deref() else {
            return TokenState::Missing;
        };
        match business.token_expires_at.as_deref() {
            None => TokenState::Valid(token.to_string()),
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(expires_at) => {
                    if now + self.margin >= expires_at {
                        TokenState::Expired
                    } else {
                        TokenState::Valid(token.to_string())
                    }
                }
                Err(_) => TokenState::Expired,
            },
        }
    }

    /// Load the business row and classify its credentials now.
    ///
    /// An unknown business id reports `Missing` -- there is nothing to send with
    /// either way.
    pub async fn get_valid_token(
        &self,
        db: &Database,
        business_id: &str,
    ) -> Result<TokenState, IgrelayError> {
        match businesses::get_business(db, business_id).await? {
            Some(business) => Ok(self.evaluate_at(&business, Utc::now())),
            None => Ok(TokenState::Missing),
        }
    }

    /// Record new credentials, overwriting any previous ones atomically.
    pub async fn record_token(
        &self,
        db: &Database,
        business_id: &str,
        token: &str,
        expires_at: Option<&str>,
    ) -> Result<bool, IgrelayError> {
        businesses::record_token(db, business_id, token, expires_at).await
    }

    /// Remove credentials (admin-triggered disconnect).
    pub async fn clear_token(&self, db: &Database, business_id: &str) -> Result<bool, IgrelayError> {
        businesses::clear_token(db, business_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::businesses::insert_business;
    use crate::test_support::{make_business, setup_db};

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    fn business_with_token(token: Option<&str>, expires_at: Option<&str>) -> Business {
        let mut business = make_business("biz-1", "page-100");
        business.page_access_token = token.map(str::to_string);
        business.token_expires_at = expires_at.map(str::to_string);
        business
    }

    #[test]
    fn missing_token_reports_missing() {
        let store = TokenStore::new(300);
        let business = business_with_token(None, None);
        assert_eq!(
            store.evaluate_at(&business, at("2026-06-01T00:00:00Z")),
            TokenState::Missing
        );
    }

    #[test]
    fn token_without_expiry_is_valid() {
        let store = TokenStore::new(300);
        let business = business_with_token(Some("tok"), None);
        assert_eq!(
            store.evaluate_at(&business, at("2026-06-01T00:00:00Z")),
            TokenState::Valid("tok".into())
        );
    }

    #[test]
    fn token_past_expiry_is_expired() {
        let store = TokenStore::new(300);
        let business = business_with_token(Some("tok"), Some("2026-06-01T00:00:00Z"));
        assert_eq!(
            store.evaluate_at(&business, at("2026-06-02T00:00:00Z")),
            TokenState::Expired
        );
    }

    #[test]
    fn token_inside_safety_margin_is_already_expired() {
        let store = TokenStore::new(300);
        let business = business_with_token(Some("tok"), Some("2026-06-01T00:05:00Z"));
        // 4 minutes before nominal expiry, inside the 5-minute margin.
        assert_eq!(
            store.evaluate_at(&business, at("2026-06-01T00:01:00Z")),
            TokenState::Expired
        );
        // 6 minutes before, outside the margin.
        assert_eq!(
            store.evaluate_at(&business, at("2026-05-31T23:59:00Z")),
            TokenState::Valid("tok".into())
        );
    }

    #[test]
    fn unparseable_expiry_is_treated_as_expired() {
        let store = TokenStore::new(300);
        let business = business_with_token(Some("tok"), Some("next tuesday"));
        assert_eq!(
            store.evaluate_at(&business, at("2026-06-01T00:00:00Z")),
            TokenState::Expired
        );
    }

    #[tokio::test]
    async fn record_then_clear_round_trip() {
        let (db, _dir) = setup_db().await;
        insert_business(&db, &make_business("biz-1", "page-100"))
            .await
            .unwrap();
        let store = TokenStore::new(300);

        assert_eq!(
            store.get_valid_token(&db, "biz-1").await.unwrap(),
            TokenState::Missing
        );

        store
            .record_token(&db, "biz-1", "tok-1", Some("2099-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(
            store.get_valid_token(&db, "biz-1").await.unwrap(),
            TokenState::Valid("tok-1".into())
        );

        store.clear_token(&db, "biz-1").await.unwrap();
        assert_eq!(
            store.get_valid_token(&db, "biz-1").await.unwrap(),
            TokenState::Missing
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_row_reports_expired() {
        let (db, _dir) = setup_db().await;
        insert_business(&db, &make_business("biz-1", "page-100"))
            .await
            .unwrap();
        let store = TokenStore::new(300);

        store
            .record_token(&db, "biz-1", "tok-old", Some("2020-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(
            store.get_valid_token(&db, "biz-1").await.unwrap(),
            TokenState::Expired
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_business_reports_missing() {
        let (db, _dir) = setup_db().await;
        let store = TokenStore::new(300);
        assert_eq!(
            store.get_valid_token(&db, "ghost").await.unwrap(),
            TokenState::Missing
        );
        db.close().await.unwrap();
    }
}

// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth and page-management helpers used by the admin connect flow.
//!
//! The OAuth redirect itself lives outside the gateway; these wrappers cover
//! the Graph calls the external collaborator needs to turn an authorization
//! code into a stored page token and subscribe the page to webhook delivery.

use igrelay_core::IgrelayError;
use serde::Deserialize;
use tracing::info;

use crate::client::{GraphClient, GraphErrorResponse};

/// Token payload returned by the `oauth/access_token` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    /// Seconds until expiry. Absent for tokens Meta considers non-expiring.
    pub expires_in: Option<i64>,
}

/// A page the user manages, with its Instagram linkage when present.
#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    pub id: String,
    pub name: Option<String>,
    pub access_token: Option<String>,
    pub instagram_business_account: Option<IgAccountRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IgAccountRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct PageList {
    data: Vec<PageInfo>,
}

impl GraphClient {
    /// Exchange an authorization code for a short-lived user token.
    pub async fn exchange_code_for_token(
        &self,
        app_id: &str,
        app_secret: &str,
        redirect_uri: &str,
        code: &str,
    ) -> Result<OAuthTokenResponse, IgrelayError> {
        let url = format!("{}/oauth/access_token", self.base_url());
        let token: OAuthTokenResponse = get_json(
            self,
            &url,
            &[
                ("client_id", app_id),
                ("client_secret", app_secret),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ],
        )
        .await?;
        info!("exchanged authorization code for short-lived token");
        Ok(token)
    }

    /// Exchange a short-lived user token for a long-lived one.
    pub async fn exchange_for_long_lived_token(
        &self,
        app_id: &str,
        app_secret: &str,
        short_lived_token: &str,
    ) -> Result<OAuthTokenResponse, IgrelayError> {
        let url = format!("{}/oauth/access_token", self.base_url());
        let token: OAuthTokenResponse = get_json(
            self,
            &url,
            &[
                ("grant_type", "fb_exchange_token"),
                ("client_id", app_id),
                ("client_secret", app_secret),
                ("fb_exchange_token", short_lived_token),
            ],
        )
        .await?;
        info!("exchanged short-lived token for long-lived token");
        Ok(token)
    }

    /// List pages the user manages, including Instagram linkage and page tokens.
    pub async fn get_user_pages(
        &self,
        user_access_token: &str,
    ) -> Result<Vec<PageInfo>, IgrelayError> {
        let url = format!("{}/me/accounts", self.base_url());
        let pages: PageList = get_json(
            self,
            &url,
            &[
                ("access_token", user_access_token),
                ("fields", "id,name,instagram_business_account,access_token"),
            ],
        )
        .await?;
        Ok(pages.data)
    }

    /// Fetch the page access token for one page.
    pub async fn get_page_access_token(
        &self,
        page_id: &str,
        user_access_token: &str,
    ) -> Result<PageInfo, IgrelayError> {
        let url = format!("{}/{page_id}", self.base_url());
        get_json(
            self,
            &url,
            &[
                ("access_token", user_access_token),
                ("fields", "id,access_token,instagram_business_account"),
            ],
        )
        .await
    }

    /// Subscribe a page to the app so webhook deliveries start flowing.
    pub async fn subscribe_page_to_app(
        &self,
        page_id: &str,
        page_access_token: &str,
    ) -> Result<(), IgrelayError> {
        let url = format!("{}/{page_id}/subscribed_apps", self.base_url());
        let response = self
            .http()
            .post(&url)
            .form(&[
                ("subscribed_fields", "messages,messaging_postbacks"),
                ("access_token", page_access_token),
            ])
            .send()
            .await
            .map_err(|e| IgrelayError::Graph {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(graph_error(status, &body));
        }
        info!(page_id, "page subscribed to app");
        Ok(())
    }
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &GraphClient,
    url: &str,
    params: &[(&str, &str)],
) -> Result<T, IgrelayError> {
    let response = client
        .http()
        .get(url)
        .query(params)
        .send()
        .await
        .map_err(|e| IgrelayError::Graph {
            message: format!("HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| IgrelayError::Graph {
        message: format!("failed to read response body: {e}"),
        source: Some(Box::new(e)),
    })?;

    if !status.is_success() {
        return Err(graph_error(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| IgrelayError::Graph {
        message: format!("failed to parse Graph response: {e}"),
        source: Some(Box::new(e)),
    })
}

fn graph_error(status: reqwest::StatusCode, body: &str) -> IgrelayError {
    let message = match serde_json::from_str::<GraphErrorResponse>(body) {
        Ok(envelope) => format!(
            "Graph API error ({}): {}",
            envelope.error.type_.as_deref().unwrap_or("unknown"),
            envelope.error.message
        ),
        Err(_) => format!("Graph API returned {status}: {body}"),
    };
    IgrelayError::Graph {
        message,
        source: None,
    }
}

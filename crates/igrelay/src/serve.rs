// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `igrelay serve` command implementation.
//!
//! Wires storage, the OpenAI responder, the Graph transport, and the webhook
//! gateway together, and runs the dedup pruner in the background.

use std::sync::Arc;
use std::time::Duration;

use igrelay_config::model::{DedupConfig, IgrelayConfig};
use igrelay_core::{IgrelayError, RetryPolicy};
use igrelay_gateway::{start_server, AiPolicy, GatewayState, OutboundDispatcher};
use igrelay_graph::GraphClient;
use igrelay_openai::OpenAiResponder;
use igrelay_storage::queries::events;
use igrelay_storage::{Database, TokenStore};
use tracing::{info, warn};

/// Runs the `igrelay serve` command.
pub async fn run_serve(config: IgrelayConfig) -> Result<(), IgrelayError> {
    init_tracing(&config.service.log_level);

    info!("starting igrelay serve");

    // The webhook surface cannot operate without these two secrets.
    let app_secret = resolve_secret(
        &config.instagram.app_secret,
        "FB_APP_SECRET",
        "instagram.app_secret",
    )?;
    let verify_token = resolve_secret(
        &config.instagram.verify_token,
        "FB_VERIFY_TOKEN",
        "instagram.verify_token",
    )?;

    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    info!(path = %config.storage.database_path, "storage ready");

    spawn_dedup_pruner(db.clone(), config.dedup.clone());

    let responder = Arc::new(OpenAiResponder::new(&config.openai)?);

    let transport = Arc::new(GraphClient::new(
        &config.instagram.graph_api_version,
        Duration::from_secs(config.send.request_timeout_secs),
        config.instagram.api_base_url.clone(),
    )?);
    let dispatcher = Arc::new(OutboundDispatcher::new(
        transport,
        RetryPolicy {
            max_attempts: config.send.max_attempts,
            base_delay: Duration::from_millis(config.send.base_delay_ms),
            max_delay: Duration::from_millis(config.send.max_delay_ms),
        },
    ));

    let state = GatewayState {
        db,
        responder,
        dispatcher,
        tokens: TokenStore::new(config.tokens.expiry_margin_secs),
        verify_token,
        app_secret,
        ai: AiPolicy {
            fallback_reply: config.openai.fallback_reply.clone(),
            fallback_on_transient: config.openai.fallback_on_transient,
            history_limit: config.openai.history_limit,
        },
        start_time: std::time::Instant::now(),
    };

    start_server(&config.server.host, config.server.port, state).await
}

/// Prune the dedup ledger on an interval, off the webhook path.
fn spawn_dedup_pruner(db: Database, config: DedupConfig) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(config.prune_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match events::prune_older_than(&db, config.retention_hours).await {
                Ok(0) => {}
                Ok(pruned) => info!(pruned, "dedup ledger pruned"),
                Err(err) => warn!(error = %err, "dedup prune failed"),
            }
        }
    });
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Config value first, then the environment variable the original deployment
/// used, then a hard error naming the config key.
fn resolve_secret(
    config_value: &Option<String>,
    env_var: &str,
    config_key: &str,
) -> Result<String, IgrelayError> {
    if let Some(value) = config_value
        && !value.is_empty()
    {
        return Ok(value.clone());
    }
    std::env::var(env_var).map_err(|_| {
        IgrelayError::Config(format!(
            "{config_key} is required. Set it in igrelay.toml or via the {env_var} environment variable."
        ))
    })
}

// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Igrelay gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Igrelay configuration.
///
/// Loaded from `igrelay.toml` (working directory, then XDG config dir) with
/// `IGRELAY_*` environment variable overrides. All sections are optional and
/// default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IgrelayConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP server bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Instagram / Meta Graph API settings.
    #[serde(default)]
    pub instagram: InstagramConfig,

    /// OpenAI responder settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Webhook event deduplication settings.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Outbound send retry settings.
    #[serde(default)]
    pub send: SendConfig,

    /// Page access token lifecycle settings.
    #[serde(default)]
    pub tokens: TokenConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "igrelay".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8085
}

/// Instagram / Meta Graph API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InstagramConfig {
    /// Meta app id. Required for OAuth token exchange.
    #[serde(default)]
    pub app_id: Option<String>,

    /// Meta app secret: the HMAC key for webhook signature verification.
    /// `None` requires the `FB_APP_SECRET` environment variable.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Token echoed back during the webhook GET verification handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Graph API version segment of request URLs.
    #[serde(default = "default_graph_api_version")]
    pub graph_api_version: String,

    /// Override for the Graph API base URL (tests, proxies). When unset the
    /// URL is derived from `graph_api_version`.
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_secret: None,
            verify_token: None,
            graph_api_version: default_graph_api_version(),
            api_base_url: None,
        }
    }
}

fn default_graph_api_version() -> String {
    "v17.0".to_string()
}

/// OpenAI responder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// OpenAI API key. `None` requires the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model to use for reply generation.
    #[serde(default = "default_model")]
    pub model: String,

    /// Token limit per response. Kept low to discourage rambling replies.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature. Low by default for consistent storefront answers.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds for the completion call.
    #[serde(default = "default_ai_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Number of recent exchanges included in the context window.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Inbound messages longer than this are truncated before prompting.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Static reply substituted when the provider rejects the content.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// When true, transient provider failures (rate limit, unavailable,
    /// timeout) also send `fallback_reply` instead of recording a failure.
    #[serde(default)]
    pub fallback_on_transient: bool,

    /// Override for the API base URL (tests, proxies).
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_ai_timeout_secs(),
            history_limit: default_history_limit(),
            max_message_length: default_max_message_length(),
            fallback_reply: default_fallback_reply(),
            fallback_on_transient: false,
            api_base_url: None,
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    300
}

fn default_temperature() -> f32 {
    0.1
}

fn default_ai_timeout_secs() -> u64 {
    30
}

fn default_history_limit() -> usize {
    3
}

fn default_max_message_length() -> usize {
    1000
}

fn default_fallback_reply() -> String {
    "Thank you for your message! I'm currently having trouble processing your \
     request. Please try again in a moment, or contact us directly for \
     immediate assistance."
        .to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("igrelay").join("igrelay.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("igrelay.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Webhook event deduplication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DedupConfig {
    /// How long dedup ledger rows are retained. Should cover the upstream
    /// provider's own retry window.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Interval between background prune passes, in seconds.
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

fn default_retention_hours() -> u64 {
    48
}

fn default_prune_interval_secs() -> u64 {
    3600
}

/// Outbound send retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SendConfig {
    /// Total attempts per send, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff base delay in milliseconds; doubles per attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Cap on any single backoff delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Request timeout in seconds for each Graph API send attempt.
    #[serde(default = "default_send_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            request_timeout_secs: default_send_timeout_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_send_timeout_secs() -> u64 {
    30
}

/// Page access token lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// Safety margin before the recorded expiry at which a token is already
    /// treated as expired, in seconds.
    #[serde(default = "default_expiry_margin_secs")]
    pub expiry_margin_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            expiry_margin_secs: default_expiry_margin_secs(),
        }
    }
}

fn default_expiry_margin_secs() -> i64 {
    300
}

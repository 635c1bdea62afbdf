// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Figment catches type errors; this pass catches values that parse but
//! cannot work at runtime.

use crate::diagnostic::ConfigError;
use crate::model::IgrelayConfig;

/// Validate a parsed configuration, collecting every problem rather than
/// stopping at the first.
pub fn validate_config(config: &IgrelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.send.max_attempts == 0 {
        errors.push(ConfigError::new(
            "send.max_attempts must be at least 1",
            Some("the first delivery attempt counts toward the limit"),
        ));
    }

    if config.send.base_delay_ms == 0 {
        errors.push(ConfigError::new(
            "send.base_delay_ms must be greater than 0",
            None,
        ));
    }

    if config.send.max_delay_ms < config.send.base_delay_ms {
        errors.push(ConfigError::new(
            "send.max_delay_ms must be >= send.base_delay_ms",
            None,
        ));
    }

    if !(0.0..=2.0).contains(&config.openai.temperature) {
        errors.push(ConfigError::new(
            "openai.temperature must be between 0.0 and 2.0",
            None,
        ));
    }

    if config.openai.history_limit == 0 {
        errors.push(ConfigError::new(
            "openai.history_limit must be at least 1",
            Some("the responder needs at least the current exchange for context"),
        ));
    }

    if config.openai.fallback_reply.trim().is_empty() {
        errors.push(ConfigError::new(
            "openai.fallback_reply must not be empty",
            Some("customers receive this text when the provider rejects a reply"),
        ));
    }

    if config.dedup.retention_hours == 0 {
        errors.push(ConfigError::new(
            "dedup.retention_hours must be at least 1",
            Some("the dedup window must cover the provider's webhook retry window"),
        ));
    }

    if config.dedup.prune_interval_secs == 0 {
        errors.push(ConfigError::new(
            "dedup.prune_interval_secs must be greater than 0",
            None,
        ));
    }

    if config.tokens.expiry_margin_secs < 0 {
        errors.push(ConfigError::new(
            "tokens.expiry_margin_secs must not be negative",
            None,
        ));
    }

    let level = config.service.log_level.as_str();
    if !["trace", "debug", "info", "warn", "error"].contains(&level) {
        errors.push(ConfigError::new(
            format!("service.log_level '{level}' is not a valid level"),
            Some("use one of: trace, debug, info, warn, error"),
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

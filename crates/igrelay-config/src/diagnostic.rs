// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostic rendering for configuration errors.
//!
//! Wraps validation and Figment failures in miette diagnostics so startup
//! errors are readable and actionable.

use miette::Diagnostic;
use thiserror::Error;

/// A single configuration problem with an optional remediation hint.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(igrelay::config))]
pub struct ConfigError {
    pub message: String,
    #[help]
    pub help: Option<String>,
}

impl ConfigError {
    pub fn new(message: impl Into<String>, help: Option<&str>) -> Self {
        Self {
            message: message.into(),
            help: help.map(str::to_string),
        }
    }
}

/// Convert a Figment extraction error into per-problem diagnostics.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| {
            ConfigError::new(
                e.to_string(),
                Some("check igrelay.toml and IGRELAY_* environment overrides"),
            )
        })
        .collect()
}

/// Print every error to stderr in miette's report format.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("{:?}", miette::Report::new(error.clone()));
    }
}

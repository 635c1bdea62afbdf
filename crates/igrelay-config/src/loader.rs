// SPDX-FileCopyrightText: 2026 Igrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loading via Figment.
//!
//! Layering, lowest precedence first: struct defaults, the XDG user config
//! file, `igrelay.toml` in the working directory, then `IGRELAY_*`
//! environment variables (double underscore separates nesting, e.g.
//! `IGRELAY_OPENAI__MODEL`).

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;

use crate::model::IgrelayConfig;

/// Load configuration from the file hierarchy and environment.
pub fn load_config() -> Result<IgrelayConfig, figment::Error> {
    base_figment().extract()
}

/// Load configuration from a specific TOML file path (plus env overrides).
pub fn load_config_from_path(path: &str) -> Result<IgrelayConfig, figment::Error> {
    Figment::from(Serialized::defaults(IgrelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Load configuration from an inline TOML string. No env overrides, so tests
/// are hermetic.
pub fn load_config_from_str(toml_content: &str) -> Result<IgrelayConfig, figment::Error> {
    Figment::from(Serialized::defaults(IgrelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

fn base_figment() -> Figment {
    let mut figment = Figment::from(Serialized::defaults(IgrelayConfig::default()));

    if let Some(config_dir) = dirs::config_dir() {
        figment = figment.merge(Toml::file(config_dir.join("igrelay/igrelay.toml")));
    }

    figment
        .merge(Toml::file("igrelay.toml"))
        .merge(env_provider())
}

fn env_provider() -> Env {
    Env::prefixed("IGRELAY_").split("__")
}

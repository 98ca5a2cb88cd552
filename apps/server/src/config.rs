// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server configuration loaded from environment variables.

use bimsync_engine::SessionOptions;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on.
    pub port: u16,
    /// Maximum request body size in MB.
    pub max_body_mb: usize,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    pub log_format: LogFormat,
    /// Prefix of the undoable command opened for each batch.
    pub undo_name_prefix: String,
    /// Export properties when a data request does not say.
    pub send_properties: bool,
    pub send_listing_parameters: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 8080),
            max_body_mb: env_or("MAX_BODY_MB", 64),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 300),
            log_format: match std::env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            undo_name_prefix: std::env::var("UNDO_NAME_PREFIX").unwrap_or_else(|_| "Synchronize".into()),
            send_properties: env_flag("SEND_PROPERTIES"),
            send_listing_parameters: env_flag("SEND_LISTING_PARAMETERS"),
        }
    }

    /// Session defaults derived from this configuration.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            undo_name_prefix: self.undo_name_prefix.clone(),
            send_properties: self.send_properties,
            send_listing_parameters: self.send_listing_parameters,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            max_body_mb: 64,
            request_timeout_secs: 300,
            log_format: LogFormat::Text,
            undo_name_prefix: "Synchronize".into(),
            send_properties: false,
            send_listing_parameters: false,
        }
    }
}

//! Layered configuration: defaults, TOML file, environment, CLI overrides.
//!
//! ```toml
//! [backend]
//! host = "localhost"
//! port = 8080
//!
//! [channel]
//! reconnect_delay_ms = 3000
//! handshake_timeout_ms = 10000
//!
//! [ui]
//! theme = "dark"
//! ```
//!
//! Every key can also be set from the environment with the `SQLSCOPE__`
//! prefix, e.g. `SQLSCOPE__BACKEND__PORT=9090`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sqlscope.toml";

/// Backend address and endpoint paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub host: String,
    pub port: u16,
    /// Use `wss://` and `https://` instead of `ws://` and `http://`.
    pub secure: bool,
    /// Raw WebSocket transport of the backend's SockJS endpoint.
    pub ws_path: String,
    pub query_path: String,
    pub status_path: String,
    pub metrics_path: String,
    /// Request timeout for REST calls; none means the transport default.
    pub request_timeout_ms: Option<u64>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            secure: false,
            ws_path: "/ws/websocket".to_string(),
            query_path: "/api/query".to_string(),
            status_path: "/api/status".to_string(),
            metrics_path: "/api/metrics".to_string(),
            request_timeout_ms: None,
        }
    }
}

impl BackendSettings {
    /// `host:port`, as sent in the STOMP `host` header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL of the live channel.
    pub fn ws_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}{}", scheme, self.authority(), self.ws_path)
    }

    /// Base URL for REST calls, without a trailing slash.
    pub fn http_base(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}", scheme, self.authority())
    }
}

/// STOMP destinations for each logical topic.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopicSettings {
    pub status: String,
    pub metrics: String,
    pub query_execution: String,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            status: "/topic/system-status".to_string(),
            metrics: "/topic/metrics".to_string(),
            query_execution: "/topic/query-execution".to_string(),
        }
    }
}

/// Live channel behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// Fixed delay between reconnection attempts.
    pub reconnect_delay_ms: u64,
    /// How long to wait for CONNECTED after sending CONNECT.
    pub handshake_timeout_ms: u64,
    pub topics: TopicSettings,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 3000,
            handshake_timeout_ms: 10_000,
            topics: TopicSettings::default(),
        }
    }
}

impl ChannelSettings {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Theme selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Auto,
    Dark,
    Light,
}

/// Terminal UI behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Animation tick while the demo or a query is running.
    pub tick_ms: u64,
    pub theme: ThemeChoice,
    /// Initial view id (`architecture`, `query-flow`, `performance`, `demo`).
    pub view: Option<String>,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            theme: ThemeChoice::Auto,
            view: None,
        }
    }
}

/// Log output. Logs are discarded unless a file is set, because the TUI
/// owns the terminal.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub file: Option<PathBuf>,
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub channel: ChannelSettings,
    pub ui: UiSettings,
    pub log: LogSettings,
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub reconnect_ms: Option<u64>,
    pub theme: Option<ThemeChoice>,
    pub log_file: Option<PathBuf>,
    pub view: Option<String>,
}

impl Settings {
    /// Load settings from `path` (required if given, otherwise the optional
    /// default file), the environment, then `overrides`.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let theme = overrides.theme.map(|t| match t {
            ThemeChoice::Auto => "auto",
            ThemeChoice::Dark => "dark",
            ThemeChoice::Light => "light",
        });

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("SQLSCOPE")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("backend.host", overrides.host)?
            .set_override_option("backend.port", overrides.port.map(i64::from))?
            .set_override_option(
                "channel.reconnect_delay_ms",
                overrides.reconnect_ms.map(|ms| ms as i64),
            )?
            .set_override_option("ui.theme", theme)?
            .set_override_option(
                "log.file",
                overrides.log_file.map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("ui.view", overrides.view)?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

use std::time::Duration;

use serde::Deserialize;

/// Engine configuration. Every field has a default so a partial (or empty)
/// TOML file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// IRC server identity the search channel lives on.
    #[serde(default = "default_server")]
    pub server: String,
    /// Channel the search bot listens in.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// How long a search session may sit awaiting a download, in ms.
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    /// Quiet period after which a hot list is considered complete, in ms.
    #[serde(default = "default_hot_idle_ms")]
    pub hot_idle_ms: u64,
    /// Base URL webhook notifications are POSTed under.
    #[serde(default = "default_webhook_base_url")]
    pub webhook_base_url: String,
    /// Hard timeout for one webhook delivery attempt, in ms.
    #[serde(default = "default_webhook_timeout_ms")]
    pub webhook_timeout_ms: u64,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Connection settings for the WeeChat relay endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_host")]
    pub host: String,
    #[serde(default = "default_relay_port")]
    pub port: u16,
    /// Relay password. Must be non-empty before any relay connection.
    #[serde(default)]
    pub password: String,
}

fn default_server() -> String {
    "irc.example.org".to_string()
}

fn default_channel() -> String {
    "#channel".to_string()
}

fn default_session_timeout_ms() -> u64 {
    300_000
}

fn default_hot_idle_ms() -> u64 {
    2_000
}

fn default_webhook_base_url() -> String {
    "http://localhost:8000/".to_string()
}

fn default_webhook_timeout_ms() -> u64 {
    10_000
}

fn default_relay_host() -> String {
    "127.0.0.1".to_string()
}

fn default_relay_port() -> u16 {
    9000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            channel: default_channel(),
            session_timeout_ms: default_session_timeout_ms(),
            hot_idle_ms: default_hot_idle_ms(),
            webhook_base_url: default_webhook_base_url(),
            webhook_timeout_ms: default_webhook_timeout_ms(),
            relay: RelayConfig::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
            port: default_relay_port(),
            password: String::new(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn hot_idle(&self) -> Duration {
        Duration::from_millis(self.hot_idle_ms)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_millis(self.webhook_timeout_ms)
    }
}

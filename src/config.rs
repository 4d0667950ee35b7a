//! Dashboard configuration.
//!
//! Values are layered: built-in defaults, then an optional config file, then
//! `COUNTWATCH_*` environment variables. The binary applies CLI flags last.
//!
//! ```toml
//! base_url = "http://localhost:8001"
//! push_url = "ws://localhost:8001/ws/live-count"
//! token = "eyJhbGciOi..."
//! poll_interval = "5s"
//! reconnect_delay = "5s"
//! retention = 100
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::duration::parse_duration;
use crate::data::{CHART_WINDOW, DEFAULT_RETENTION};
use crate::engine::{Engine, EngineSettings};
use crate::sync::http::{HISTORY_PATH, SNAPSHOT_PATH};
use crate::sync::websocket::PUSH_URL;
use crate::sync::{HttpClient, ReconnectPolicy, WebSocketConnector};

/// Prefix for environment overrides, e.g. `COUNTWATCH_TOKEN`.
pub const ENV_PREFIX: &str = "COUNTWATCH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub base_url: String,
    pub snapshot_path: String,
    pub history_path: String,
    pub push_url: String,
    /// Bearer credential issued by the session layer.
    pub token: Option<String>,
    pub poll_interval: String,
    pub reconnect_delay: String,
    pub max_reconnect_attempts: Option<u32>,
    pub request_timeout: String,
    pub retention: usize,
    pub chart_window: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            snapshot_path: SNAPSHOT_PATH.to_string(),
            history_path: HISTORY_PATH.to_string(),
            push_url: PUSH_URL.to_string(),
            token: None,
            poll_interval: "5s".to_string(),
            reconnect_delay: "5s".to_string(),
            max_reconnect_attempts: None,
            request_timeout: "10s".to_string(),
            retention: DEFAULT_RETENTION,
            chart_window: CHART_WINDOW,
        }
    }
}

impl DashboardConfig {
    /// Load defaults, the optional file, and environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration")?;

        let parsed: Self = config
            .try_deserialize()
            .context("Invalid configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Check every value that is parsed lazily.
    pub fn validate(&self) -> Result<()> {
        let poll = duration_key("poll_interval", &self.poll_interval)?;
        if poll.is_zero() {
            bail!("poll_interval must be greater than zero");
        }
        duration_key("reconnect_delay", &self.reconnect_delay)?;
        duration_key("request_timeout", &self.request_timeout)?;
        if self.retention == 0 {
            bail!("retention must be at least 1");
        }
        if self.chart_window == 0 {
            bail!("chart_window must be at least 1");
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> Result<EngineSettings> {
        Ok(EngineSettings {
            poll_interval: duration_key("poll_interval", &self.poll_interval)?,
            reconnect: ReconnectPolicy {
                delay: duration_key("reconnect_delay", &self.reconnect_delay)?,
                max_attempts: self.max_reconnect_attempts,
            },
            retention: self.retention,
            chart_window: self.chart_window,
        })
    }

    pub fn request_timeout(&self) -> Result<Duration> {
        duration_key("request_timeout", &self.request_timeout)
    }

    pub fn http_client(&self) -> Result<HttpClient> {
        HttpClient::builder()
            .base_url(&self.base_url)
            .snapshot_path(&self.snapshot_path)
            .history_path(&self.history_path)
            .token(self.token.clone())
            .timeout(self.request_timeout()?)
            .build()
            .context("Failed to build HTTP client")
    }

    pub fn push_connector(&self) -> Result<WebSocketConnector> {
        Ok(WebSocketConnector::new(
            &self.push_url,
            self.token.clone(),
            self.request_timeout()?,
        ))
    }

    /// Build both network producers and start an engine. Must be called from
    /// within a tokio runtime.
    pub fn start_engine(&self) -> Result<Engine> {
        let settings = self.engine_settings()?;
        let client = Arc::new(self.http_client()?);
        let connector = Arc::new(self.push_connector()?);
        Ok(Engine::start(settings, client, connector))
    }
}

fn duration_key(key: &str, value: &str) -> Result<Duration> {
    parse_duration(value).with_context(|| format!("Invalid {}: {:?}", key, value))
}

// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "meetsignal.toml";
/// Prefix for environment overrides, nested keys split on `__`
pub const ENV_PREFIX: &str = "MEETSIGNAL_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// `<scheme>://<host>:<port>` the broadcast subprocess uses to reach the
    /// viewer page
    pub viewer_base_url: String,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Conferencing backend
    pub backend: BackendSettings,
    /// Broadcast subprocess
    pub broadcast: BroadcastSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote conferencing REST API
    Http,
    /// In-process backend for local development
    Memory,
}

/// Conferencing backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    pub kind: BackendKind,
    /// Base URL of the conferencing API
    pub endpoint: String,
    /// Media region used when a join request does not name one
    pub default_region: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Broadcast subprocess settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastSettings {
    /// Container runtime invocation; the first element is the program
    pub command: Vec<String>,
    /// Image run for each broadcast
    pub image: String,
    /// Fixed name the running broadcast is addressed by
    pub container_name: String,
    /// Container network mode
    pub network: String,
    /// Shared memory size handed to the headless browser
    pub shm_size: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            viewer_base_url: "http://127.0.0.1:8080".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            backend: BackendSettings::default(),
            broadcast: BroadcastSettings::default(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::Http,
            endpoint: "https://service.chime.aws.amazon.com/console".to_string(),
            default_region: "us-east-1".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            command: vec!["docker".to_string()],
            image: "meetingbcast:latest".to_string(),
            container_name: "bcast".to_string(),
            network: "host".to_string(),
            shm_size: "2g".to_string(),
        }
    }
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Settings {
    /// Layered sources: defaults, then the TOML file, then `MEETSIGNAL_*`
    /// environment variables.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate settings. An explicitly named file must exist; the
    /// default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            if !p.exists() {
                bail!("config file {} does not exist", p.display());
            }
        }

        let settings: Settings = Self::figment(path)
            .extract()
            .context("failed to read configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("unknown log level {:?}", self.log_level);
        }

        if !(self.viewer_base_url.starts_with("http://")
            || self.viewer_base_url.starts_with("https://"))
        {
            bail!("viewer_base_url must be an http(s) URL");
        }

        if self.backend.kind == BackendKind::Http && self.backend.endpoint.trim().is_empty() {
            bail!("backend.endpoint is required for the http backend");
        }

        if self.backend.request_timeout_secs == 0 {
            bail!("backend.request_timeout_secs must be greater than zero");
        }

        if self.backend.default_region.trim().is_empty() {
            bail!("backend.default_region must not be empty");
        }

        match self.broadcast.command.first() {
            Some(program) if !program.trim().is_empty() => {},
            _ => bail!("broadcast.command must name a program"),
        }

        if self.broadcast.container_name.trim().is_empty() {
            bail!("broadcast.container_name must not be empty");
        }

        if self.broadcast.image.trim().is_empty() {
            bail!("broadcast.image must not be empty");
        }

        Ok(())
    }
}

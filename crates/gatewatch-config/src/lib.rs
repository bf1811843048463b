//! Configuration for the gateway control plane.
//!
//! TOML file + environment overrides (`GATEWATCH_` prefix, `__` as the
//! nesting separator), merged over built-in defaults. Translation
//! helpers produce the values `gatewatch-core` components consume:
//! the router daemon URL, debounce windows, and the interception
//! service names.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default config file path on the gateway.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gatewatch/config.toml";

const ENV_PREFIX: &str = "GATEWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config structs ──────────────────────────────────────────────────

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Whether a router daemon manages this deployment. Unmanaged
    /// deployments fall back to interface discovery.
    #[serde(default = "default_managed")]
    pub managed: bool,

    #[serde(default)]
    pub router: RouterEndpoint,

    #[serde(default)]
    pub timing: Timing,

    #[serde(default)]
    pub interception: Interception,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            managed: default_managed(),
            router: RouterEndpoint::default(),
            timing: Timing::default(),
            interception: Interception::default(),
        }
    }
}

fn default_managed() -> bool {
    true
}

/// Where the router daemon listens.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouterEndpoint {
    #[serde(default = "default_router_host")]
    pub host: String,

    #[serde(default = "default_router_port")]
    pub port: u16,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_router_timeout")]
    pub timeout: u64,
}

impl Default for RouterEndpoint {
    fn default() -> Self {
        Self {
            host: default_router_host(),
            port: default_router_port(),
            api_version: default_api_version(),
            timeout: default_router_timeout(),
        }
    }
}

fn default_router_host() -> String {
    "127.0.0.1".into()
}
fn default_router_port() -> u16 {
    8837
}
fn default_api_version() -> String {
    "v1".into()
}
fn default_router_timeout() -> u64 {
    30
}

impl RouterEndpoint {
    /// The versioned API root, e.g. `http://127.0.0.1:8837/v1`.
    pub fn url(&self) -> Result<Url, ConfigError> {
        let raw = format!("http://{}:{}/{}", self.host, self.port, self.api_version);
        raw.parse().map_err(|_| ConfigError::Validation {
            field: "router".into(),
            reason: format!("invalid URL: {raw}"),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Debounce windows and grace periods, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Timing {
    #[serde(default = "default_quiet_secs")]
    pub reload_quiet_secs: u64,

    #[serde(default = "default_quiet_secs")]
    pub restart_quiet_secs: u64,

    #[serde(default = "default_demotion_grace_secs")]
    pub demotion_grace_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            reload_quiet_secs: default_quiet_secs(),
            restart_quiet_secs: default_quiet_secs(),
            demotion_grace_secs: default_demotion_grace_secs(),
        }
    }
}

fn default_quiet_secs() -> u64 {
    3
}
fn default_demotion_grace_secs() -> u64 {
    8
}

impl Timing {
    pub fn reload_quiet(&self) -> Duration {
        Duration::from_secs(self.reload_quiet_secs)
    }

    pub fn restart_quiet(&self) -> Duration {
        Duration::from_secs(self.restart_quiet_secs)
    }

    pub fn demotion_grace(&self) -> Duration {
        Duration::from_secs(self.demotion_grace_secs)
    }
}

/// Names and paths of the OS-level interception services.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Interception {
    #[serde(default = "default_v4_unit")]
    pub v4_unit: String,

    #[serde(default = "default_v6_unit")]
    pub v6_unit: String,

    /// Directory for per-instance binding files the services read.
    #[serde(default = "default_intercept_dir")]
    pub config_dir: PathBuf,
}

impl Default for Interception {
    fn default() -> Self {
        Self {
            v4_unit: default_v4_unit(),
            v6_unit: default_v6_unit(),
            config_dir: default_intercept_dir(),
        }
    }
}

fn default_v4_unit() -> String {
    "gatewatch-intercept4".into()
}
fn default_v6_unit() -> String {
    "gatewatch-intercept6".into()
}
fn default_intercept_dir() -> PathBuf {
    PathBuf::from("/var/run/gatewatch/intercept")
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load configuration from a file plus `GATEWATCH_`-prefixed env vars.
///
/// Precedence, lowest first: built-in defaults, the TOML file, the
/// environment. A missing file is fine — defaults and env still apply.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(GatewayConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: GatewayConfig = figment.extract()?;
    Ok(config)
}

/// Load from the canonical on-gateway path.
pub fn load_default() -> Result<GatewayConfig, ConfigError> {
    load_config(Path::new(DEFAULT_CONFIG_PATH))
}

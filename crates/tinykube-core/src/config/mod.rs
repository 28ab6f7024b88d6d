mod liveness;
mod observability;

pub use liveness::LivenessConfig;
pub use observability::ObservabilityConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TinykubeError};

/// Root configuration for TinyKube.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TinykubeConfig {
    /// Control-plane configuration.
    #[serde(default)]
    pub control: ControlConfig,

    /// Agent configuration.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Liveness thresholds and sweep cadence.
    #[serde(default)]
    pub liveness: LivenessConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl TinykubeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TinykubeError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let content = substitute_env_vars(content);

        toml::from_str(&content)
            .map_err(|e| TinykubeError::Config(format!("Failed to parse config: {}", e)))
    }
}

/// Control-plane configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Address the control plane listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:50051".to_string()
}

/// Agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Control-plane address (`host:port` or a full URL).
    #[serde(default = "default_server")]
    pub server: String,

    /// Node name. Defaults to the host name when unset.
    #[serde(default)]
    pub node_name: Option<String>,

    /// Interval between heartbeats, in milliseconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            node_name: None,
            heartbeat_interval_ms: default_heartbeat_interval(),
        }
    }
}

impl AgentConfig {
    /// Heartbeat interval as a duration.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

fn default_server() -> String {
    "localhost:50051".to_string()
}

fn default_heartbeat_interval() -> u64 {
    1_000
}

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") {
        Ok(re) => re,
        Err(_) => return content.to_string(),
    };

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

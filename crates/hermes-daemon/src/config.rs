//! Daemon configuration file.
//!
//! ```toml
//! machine_id = "Oven-3"
//!
//! [downstream]
//! port = 50101
//! allowed_client = "10.0.0.12"
//!
//! [upstream]
//! host = "10.0.0.10"
//! lane_id = 1
//!
//! [vertical]
//! check_alive_response = "application"
//!
//! [configuration]
//! ```
//!
//! Every table is optional; a role runs only if its table is present.

use hermes_core::{
    CheckAliveResponseMode, CheckState, DEFAULT_CHECK_ALIVE_PERIOD, DEFAULT_CONFIGURATION_PORT,
    DEFAULT_HORIZONTAL_PORT, DEFAULT_RETRY_DELAY, DEFAULT_VERTICAL_PORT, NetworkConfiguration,
    Settings,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    pub machine_id: String,
    pub downstream: Option<RoleConfig>,
    pub upstream: Option<RoleConfig>,
    pub vertical: Option<RoleConfig>,
    pub configuration: Option<RoleConfig>,
}

/// One `[role]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleConfig {
    pub host: String,
    pub port: Option<u16>,
    pub lane_id: Option<u32>,
    pub interface_id: Option<String>,
    pub retry_delay_ms: Option<u64>,
    pub check_alive_period_ms: Option<u64>,
    pub allowed_client: Option<String>,
    pub check_state: CheckState,
    pub check_alive_response: CheckAliveResponseMode,
}

impl RoleConfig {
    pub fn lane_id(&self) -> u32 {
        self.lane_id.unwrap_or(1)
    }

    pub fn settings(&self, default_port: u16) -> Settings {
        Settings {
            network: NetworkConfiguration {
                host: self.host.clone(),
                port: self.port.unwrap_or(default_port),
                retry_delay: self
                    .retry_delay_ms
                    .map_or(DEFAULT_RETRY_DELAY, Duration::from_millis),
                check_alive_period: self
                    .check_alive_period_ms
                    .map_or(DEFAULT_CHECK_ALIVE_PERIOD, Duration::from_millis),
            },
            allowed_client: self.allowed_client.clone(),
            check_state: self.check_state,
            check_alive_response: self.check_alive_response,
        }
    }
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: DaemonConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.machine_id.trim().is_empty() {
            return Err(ConfigError::Invalid("machine_id must not be empty".into()));
        }
        if let Some(upstream) = &self.upstream
            && upstream.host.is_empty()
        {
            return Err(ConfigError::Invalid(
                "[upstream] needs the host of the previous machine".into(),
            ));
        }
        if self.upstream.as_ref().is_some_and(|u| u.allowed_client.is_some()) {
            return Err(ConfigError::Invalid(
                "allowed_client only applies to listening roles".into(),
            ));
        }
        Ok(())
    }

    pub fn downstream_settings(&self) -> Option<Settings> {
        self.downstream
            .as_ref()
            .map(|c| c.settings(DEFAULT_HORIZONTAL_PORT))
    }

    pub fn upstream_settings(&self) -> Option<Settings> {
        self.upstream
            .as_ref()
            .map(|c| c.settings(DEFAULT_HORIZONTAL_PORT))
    }

    pub fn vertical_settings(&self) -> Option<Settings> {
        self.vertical.as_ref().map(|c| c.settings(DEFAULT_VERTICAL_PORT))
    }

    pub fn configuration_settings(&self) -> Option<Settings> {
        self.configuration
            .as_ref()
            .map(|c| c.settings(DEFAULT_CONFIGURATION_PORT))
    }
}

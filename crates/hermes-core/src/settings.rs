//! Per-role settings supplied by the hosting application.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default port of the horizontal (Downstream/Upstream) interfaces.
pub const DEFAULT_HORIZONTAL_PORT: u16 = 50101;
/// Default port of the vertical interface.
pub const DEFAULT_VERTICAL_PORT: u16 = 50100;
/// Default port of the remote configuration service.
pub const DEFAULT_CONFIGURATION_PORT: u16 = 1248;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_CHECK_ALIVE_PERIOD: Duration = Duration::from_secs(60);

/// Where to listen or connect, and the timing policy of the transport.
///
/// Replacing it restarts the transport; it never changes under a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfiguration {
    /// Peer host for client roles; bind address for server roles (empty binds all).
    pub host: String,
    pub port: u16,
    /// Delay before retrying a failed connect or listen, in milliseconds on the wire.
    #[serde(with = "millis", rename = "retry_delay_ms")]
    pub retry_delay: Duration,
    /// Idle period after which a `CheckAlive` is sent. Zero disables it.
    #[serde(with = "millis", rename = "check_alive_period_ms")]
    pub check_alive_period: Duration,
}

impl NetworkConfiguration {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// The address a server role binds to.
    pub fn bind_address(&self) -> (&str, u16) {
        let host = if self.host.is_empty() {
            "0.0.0.0"
        } else {
            &self.host
        };
        (host, self.port)
    }
}

impl Default for NetworkConfiguration {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_HORIZONTAL_PORT,
            retry_delay: DEFAULT_RETRY_DELAY,
            check_alive_period: DEFAULT_CHECK_ALIVE_PERIOD,
        }
    }
}

/// How strictly locally signaled messages are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    /// Illegal sends end the session with a client error.
    #[default]
    SendAndReceive,
    /// Illegal sends are logged and forwarded unchanged.
    OnlyReceive,
}

/// Who answers a received `CheckAlive` ping on the vertical interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckAliveResponseMode {
    /// The engine answers with a pong carrying the ping's id.
    #[default]
    Auto,
    /// The ping is delivered and the application answers.
    Application,
}

/// Everything one role instance needs to run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub network: NetworkConfiguration,
    /// Server roles only: the single host allowed to connect.
    pub allowed_client: Option<String>,
    pub check_state: CheckState,
    pub check_alive_response: CheckAliveResponseMode,
}

impl Settings {
    pub fn new(network: NetworkConfiguration) -> Self {
        Self {
            network,
            ..Default::default()
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

use crate::prelude::*;

use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub endpoint: Endpoint,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,

    #[serde(default = "Config::default_connect_delay_secs")]
    pub connect_delay_secs: u64,
    #[serde(default = "Config::default_io_timeout_secs")]
    pub io_timeout_secs: u64,
    /// Idle time after which a write logs in again. Must be non-zero.
    #[serde(default = "Config::default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    #[serde(default = "Config::default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub switch_policy: SwitchPolicy,

    #[serde(default = "Config::default_soc_wait_attempts")]
    pub soc_wait_attempts: u32,
    #[serde(default = "Config::default_soc_wait_interval_secs")]
    pub soc_wait_interval_secs: u64,

    /// Optional path to append every report to, one JSON object per line
    pub datalog_file: Option<String>,
}

// Endpoint {{{
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Tcp(Tcp),
    Rtu(Rtu),
}

impl Endpoint {
    pub fn slave_id(&self) -> u8 {
        match self {
            Endpoint::Tcp(tcp) => tcp.slave_id,
            Endpoint::Rtu(rtu) => rtu.slave_id,
        }
    }

    pub fn is_serial(&self) -> bool {
        matches!(self, Endpoint::Rtu(_))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp(tcp) => write!(f, "tcp://{}:{} (slave {})", tcp.host, tcp.port, tcp.slave_id),
            Endpoint::Rtu(rtu) => write!(f, "rtu://{}@{} (slave {})", rtu.port, rtu.baud_rate, rtu.slave_id),
        }
    }
} // }}}

// Tcp {{{
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Tcp {
    pub host: String,
    #[serde(default = "Config::default_tcp_port")]
    pub port: u16,
    #[serde(default)]
    pub slave_id: u8,

    #[serde(default = "Config::default_username")]
    pub username: String,
    pub password: Option<String>,
}
impl Tcp {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn slave_id(&self) -> u8 {
        self.slave_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &Option<String> {
        &self.password
    }
} // }}}

// Rtu {{{
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Rtu {
    pub port: String,
    #[serde(default = "Config::default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "Config::default_rtu_slave_id")]
    pub slave_id: u8,
}
impl Rtu {
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn slave_id(&self) -> u8 {
        self.slave_id
    }
} // }}}

/// What the sequencer does after a step fails outright.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Continue,
    Abort,
}

/// What the coordinator does when asked to force a mode while one is active.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwitchPolicy {
    #[default]
    Reject,
    StopFirst,
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("error reading {}: {}", file, err))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;

        config.validate()?;
        Ok(config)
    }

    /// Call after the logger is initialised.
    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!("  Endpoint: {}", self.endpoint);
        if let Endpoint::Tcp(tcp) = &self.endpoint {
            info!("    Username: {}", tcp.username);
            info!("    Password: {}", if tcp.password.is_some() { "set" } else { "not set" });
        }
        info!("  Connect delay: {}s", self.connect_delay_secs);
        info!("  I/O timeout: {}s", self.io_timeout_secs);
        info!("  Session timeout: {}s", self.session_timeout_secs);
        info!("  Poll interval: {}s", self.poll_interval_secs);
        info!("  Failure policy: {:?}", self.failure_policy);
        info!("  Switch policy: {:?}", self.switch_policy);
        info!("  Datalog file: {}", self.datalog_file.as_deref().unwrap_or("none"));
        info!("  Log Level: {}", self.loglevel);
    }

    fn validate(&self) -> Result<()> {
        match &self.endpoint {
            Endpoint::Tcp(tcp) => {
                if tcp.host.is_empty() {
                    bail!("endpoint.tcp.host cannot be empty");
                }
                if tcp.port == 0 {
                    bail!("endpoint.tcp.port must be between 1 and 65535");
                }
                if tcp.username.is_empty() {
                    bail!("endpoint.tcp.username cannot be empty");
                }
            }
            Endpoint::Rtu(rtu) => {
                if rtu.port.is_empty() {
                    bail!("endpoint.rtu.port cannot be empty");
                }
                if rtu.baud_rate == 0 {
                    bail!("endpoint.rtu.baud_rate cannot be 0");
                }
            }
        }

        if self.io_timeout_secs == 0 {
            bail!("io_timeout_secs cannot be 0");
        }
        if self.session_timeout_secs == 0 {
            bail!("session_timeout_secs cannot be 0");
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs cannot be 0");
        }
        if self.soc_wait_attempts == 0 {
            bail!("soc_wait_attempts cannot be 0");
        }
        if self.soc_wait_interval_secs == 0 {
            bail!("soc_wait_interval_secs cannot be 0");
        }

        Ok(())
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn loglevel(&self) -> &str {
        &self.loglevel
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_secs(self.connect_delay_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn switch_policy(&self) -> SwitchPolicy {
        self.switch_policy
    }

    pub fn soc_wait_attempts(&self) -> u32 {
        self.soc_wait_attempts
    }

    pub fn soc_wait_interval(&self) -> Duration {
        Duration::from_secs(self.soc_wait_interval_secs)
    }

    /// Login for network endpoints that have a password configured.
    pub fn credential(&self) -> Option<Credential> {
        match &self.endpoint {
            Endpoint::Tcp(tcp) => tcp
                .password()
                .as_ref()
                .map(|password| Credential::new(tcp.username(), password.as_str())),
            Endpoint::Rtu(_) => None,
        }
    }

    pub fn datalog_file(&self) -> Option<&str> {
        self.datalog_file.as_deref()
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }

    fn default_connect_delay_secs() -> u64 {
        3
    }

    fn default_io_timeout_secs() -> u64 {
        5
    }

    fn default_session_timeout_secs() -> u64 {
        60
    }

    fn default_poll_interval_secs() -> u64 {
        5
    }

    fn default_soc_wait_attempts() -> u32 {
        20
    }

    fn default_soc_wait_interval_secs() -> u64 {
        30
    }

    fn default_tcp_port() -> u16 {
        502
    }

    fn default_username() -> String {
        "installer".to_string()
    }

    fn default_baud_rate() -> u32 {
        9600
    }

    fn default_rtu_slave_id() -> u8 {
        1
    }
}

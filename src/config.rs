//! Node configuration parameters
//!
//! Everything that used to be a per-device build flag (device identity,
//! broker address, intervals, change thresholds)
//! lives in one immutable [`NodeConfig`] built at startup and handed to
//! the node core. Values come from the [`registry`](crate::registry),
//! from NVS, or from a JSON document.

use core::fmt;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Maximum length of a device id (bounded so every topic fits in a [`Topic`](crate::mqtt::topics::Topic)).
pub const MAX_DEVICE_ID_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Which kind of node this firmware instance runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Sensor,
    Relay,
}

impl NodeRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Relay => "relay",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable identity of one physical node.
///
/// The id is validated on construction: it must be usable verbatim as a
/// single MQTT topic level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawIdentity")]
pub struct DeviceIdentity {
    id: String<MAX_DEVICE_ID_LEN>,
    name: String<48>,
    location: String<32>,
}

#[derive(Deserialize)]
struct RawIdentity {
    id: std::string::String,
    name: std::string::String,
    location: std::string::String,
}

impl TryFrom<RawIdentity> for DeviceIdentity {
    type Error = ConfigError;

    fn try_from(raw: RawIdentity) -> Result<Self, Self::Error> {
        Self::new(&raw.id, &raw.name, &raw.location)
    }
}

impl DeviceIdentity {
    pub fn new(id: &str, name: &str, location: &str) -> Result<Self, ConfigError> {
        validate_device_id(id)?;
        Ok(Self {
            id: bounded(id, "device id too long")?,
            name: bounded(name, "device name must be at most 48 bytes")?,
            location: bounded(location, "device location must be at most 32 bytes")?,
        })
    }

    /// Build from compile-time registry data, truncating by capacity.
    /// Registry entries are checked against [`DeviceIdentity::new`] in tests.
    pub(crate) fn trusted(id: &str, name: &str, location: &str) -> Self {
        Self {
            id: String::try_from(id).unwrap_or_default(),
            name: String::try_from(name).unwrap_or_default(),
            location: String::try_from(location).unwrap_or_default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

fn bounded<const N: usize>(s: &str, err: &'static str) -> Result<String<N>, ConfigError> {
    let mut out = String::new();
    out.push_str(s).map_err(|()| ConfigError::ValidationFailed(err))?;
    Ok(out)
}

/// A device id becomes one topic level, so MQTT separators and wildcards
/// are forbidden.
fn validate_device_id(id: &str) -> Result<(), ConfigError> {
    if id.is_empty() || id.len() > MAX_DEVICE_ID_LEN {
        return Err(ConfigError::ValidationFailed(
            "device id must be 1–32 bytes",
        ));
    }
    if id
        .chars()
        .any(|c| matches!(c, '/' | '+' | '#') || c.is_whitespace() || c.is_control())
    {
        return Err(ConfigError::ValidationFailed(
            "device id must not contain '/', '+', '#' or whitespace",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Policy sections
// ---------------------------------------------------------------------------

/// Sampling and publishing cadence, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Sensor sampling period.
    pub reading_interval_ms: u32,
    /// Status (liveness) publish period.
    pub heartbeat_interval_ms: u32,
    /// Maximum time between two `data` publishes, even without change.
    pub data_send_interval_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reading_interval_ms: 5_000,
            heartbeat_interval_ms: 30_000,
            data_send_interval_ms: 60_000,
        }
    }
}

/// Minimum change that makes a new reading worth publishing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    /// Temperature change in °C.
    pub temp_delta: f32,
    /// Relative humidity change in %.
    pub humid_delta: f32,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            temp_delta: 0.5,
            humid_delta: 2.0,
        }
    }
}

/// MQTT broker connection parameters. Only the transport adapter reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub host: String<64>,
    pub port: u16,
    pub username: String<32>,
    pub password: String<64>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: String::try_from("192.168.18.236").unwrap_or_default(),
            port: 1883,
            username: String::try_from("homeguard").unwrap_or_default(),
            password: String::new(),
        }
    }
}

/// Wi-Fi station parameters. Only the Wi-Fi adapter reads these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: String<32>,
    pub password: String<64>,
}

/// Relay output options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayOptions {
    /// Relay module energises on a LOW output level.
    pub active_low: bool,
    /// Restore the last relay state (and sequence number) from storage at boot.
    pub restore_state: bool,
}

// ---------------------------------------------------------------------------
// NodeConfig
// ---------------------------------------------------------------------------

/// Complete, immutable configuration for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub identity: DeviceIdentity,
    pub role: NodeRole,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub thresholds: ThresholdPolicy,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub wifi: WifiConfig,
    #[serde(default)]
    pub relay: RelayOptions,
}

impl Default for NodeConfig {
    fn default() -> Self {
        crate::registry::DEFAULT_SENSOR.to_config()
    }
}

impl NodeConfig {
    /// Build a config for `identity` with every policy at its default.
    pub fn new(identity: DeviceIdentity, role: NodeRole) -> Self {
        Self {
            identity,
            role,
            timing: TimingConfig::default(),
            thresholds: ThresholdPolicy::default(),
            broker: BrokerConfig::default(),
            wifi: WifiConfig::default(),
            relay: RelayOptions::default(),
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_device_id(self.identity.id())?;

        let t = &self.timing;
        if !(100..=3_600_000).contains(&t.reading_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "reading_interval_ms must be 100–3600000",
            ));
        }
        if !(100..=3_600_000).contains(&t.heartbeat_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "heartbeat_interval_ms must be 100–3600000",
            ));
        }
        if !(100..=3_600_000).contains(&t.data_send_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "data_send_interval_ms must be 100–3600000",
            ));
        }
        if t.reading_interval_ms > t.heartbeat_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "reading_interval_ms must not exceed heartbeat_interval_ms",
            ));
        }

        let th = &self.thresholds;
        if !(th.temp_delta.is_finite() && th.temp_delta > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "temp_delta must be a positive number",
            ));
        }
        if !(th.humid_delta.is_finite() && th.humid_delta > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "humid_delta must be a positive number",
            ));
        }

        if self.broker.host.is_empty() {
            return Err(ConfigError::ValidationFailed("broker host must be set"));
        }
        if self.broker.port == 0 {
            return Err(ConfigError::ValidationFailed("broker port must be non-zero"));
        }
        Ok(())
    }
}

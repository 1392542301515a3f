//! Payload codec.
//!
//! Inbound, a command is the bare ASCII word (`ON`, `READ`, ...) with no
//! framing, matched byte for byte. Outbound, every payload is a small
//! JSON object:
//!
//! ```text
//!  data   {"device_id","device_name","location","sensor_type",
//!          "temperature","humidity","rssi","uptime","timestamp"}
//!  status {"device_id","status":"online","reason","uptime","rssi",
//!          "diagnostics":{..},"last_reading":{..}|null}        (sensor)
//!         {"device_id","state","requested","seq","fault"}      (relay)
//!  info   {"device_id","device_name","location","role","firmware"}
//!  will   {"status":"offline"}
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::commands::Command;
use crate::app::events::{RelayReport, SensorReading};
use crate::config::{DeviceIdentity, NodeRole};
use crate::diagnostics::NodeDiagnostics;
use crate::error::CommandError;

/// Sensor model reported in the data payload.
pub const SENSOR_TYPE: &str = "DHT11";

/// Retained last-will payload registered with the broker.
pub const OFFLINE_PAYLOAD: &[u8] = br#"{"status":"offline"}"#;

const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Errors ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Payload is not valid JSON or misses a required field.
    Malformed,
    /// Serialization failed.
    Encode,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed payload"),
            Self::Encode => write!(f, "payload encoding failed"),
        }
    }
}

impl std::error::Error for CodecError {}

// ── Commands ─────────────────────────────────────────────────

/// Decode a command payload.
///
/// Total over every byte string: exact, case-sensitive match against the
/// known words, everything else is [`CommandError::Unknown`].
pub fn decode_command(payload: &[u8]) -> Result<Command, CommandError> {
    Command::ALL
        .into_iter()
        .find(|c| c.wire_name().as_bytes() == payload)
        .ok_or(CommandError::Unknown)
}

// ── Readings ─────────────────────────────────────────────────

/// Everything that goes into one `data` publish.
#[derive(Debug, Clone, Serialize)]
pub struct ReadingPayload<'a> {
    pub device_id: &'a str,
    pub device_name: &'a str,
    pub location: &'a str,
    pub sensor_type: &'static str,
    pub temperature: f32,
    pub humidity: f32,
    pub rssi: Option<i8>,
    /// Seconds since boot.
    pub uptime: u64,
    /// Monotonic milliseconds at which the sample was taken.
    pub timestamp: u64,
}

impl<'a> ReadingPayload<'a> {
    pub fn new(identity: &'a DeviceIdentity, reading: &SensorReading, rssi: Option<i8>, now_ms: u64) -> Self {
        Self {
            device_id: identity.id(),
            device_name: identity.name(),
            location: identity.location(),
            sensor_type: SENSOR_TYPE,
            temperature: reading.temperature,
            humidity: reading.humidity,
            rssi,
            uptime: now_ms / 1000,
            timestamp: reading.timestamp_ms,
        }
    }
}

pub fn encode_reading(payload: &ReadingPayload<'_>) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(payload).map_err(|_| CodecError::Encode)
}

#[derive(Deserialize)]
struct ReadingFields {
    temperature: f32,
    humidity: f32,
    timestamp: u64,
}

/// Recover the reading carried by a `data` payload.
pub fn decode_reading(payload: &[u8]) -> Result<SensorReading, CodecError> {
    let f: ReadingFields = serde_json::from_slice(payload).map_err(|_| CodecError::Malformed)?;
    Ok(SensorReading {
        temperature: f.temperature,
        humidity: f.humidity,
        timestamp_ms: f.timestamp,
    })
}

// ── Sensor status ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LastReading {
    pub temperature: f32,
    pub humidity: f32,
    pub timestamp: u64,
}

impl From<&SensorReading> for LastReading {
    fn from(r: &SensorReading) -> Self {
        Self {
            temperature: r.temperature,
            humidity: r.humidity,
            timestamp: r.timestamp_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusPayload<'a> {
    pub device_id: &'a str,
    pub status: &'static str,
    pub reason: &'static str,
    pub uptime: u64,
    pub rssi: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heap_free: Option<u32>,
    pub diagnostics: NodeDiagnostics,
    pub last_reading: Option<LastReading>,
}

pub fn encode_status(payload: &StatusPayload<'_>) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(payload).map_err(|_| CodecError::Encode)
}

// ── Identity ─────────────────────────────────────────────────

#[derive(Serialize)]
struct InfoPayload<'a> {
    device_id: &'a str,
    device_name: &'a str,
    location: &'a str,
    role: NodeRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    sensor_type: Option<&'static str>,
    firmware: &'static str,
}

pub fn encode_info(identity: &DeviceIdentity, role: NodeRole) -> Result<Vec<u8>, CodecError> {
    let p = InfoPayload {
        device_id: identity.id(),
        device_name: identity.name(),
        location: identity.location(),
        role,
        sensor_type: (role == NodeRole::Sensor).then_some(SENSOR_TYPE),
        firmware: FIRMWARE_VERSION,
    };
    serde_json::to_vec(&p).map_err(|_| CodecError::Encode)
}

// ── Relay status ─────────────────────────────────────────────

#[derive(Serialize)]
struct RelayStatusPayload<'a> {
    device_id: &'a str,
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    requested: Option<&'static str>,
    seq: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    fault: Option<&'static str>,
}

pub fn encode_relay_status(device_id: &str, report: &RelayReport) -> Result<Vec<u8>, CodecError> {
    let p = RelayStatusPayload {
        device_id,
        state: report.state.as_str(),
        requested: report.requested.map(|s| s.as_str()),
        seq: report.seq,
        fault: report.fault,
    };
    serde_json::to_vec(&p).map_err(|_| CodecError::Encode)
}

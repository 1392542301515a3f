//! Domain values produced by the node cores.
//!
//! Everything in here leaves a core only in serialized form, through the
//! [`codec`](crate::mqtt::codec) and a [`TransportPort`](super::ports::TransportPort).

use core::fmt;

use serde::{Deserialize, Serialize};

/// Raw output of one sensor acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity, percent.
    pub humidity: f32,
}

/// A measurement stamped with the monotonic time it was taken at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f32,
    pub humidity: f32,
    pub timestamp_ms: u64,
}

impl SensorReading {
    pub fn new(m: Measurement, timestamp_ms: u64) -> Self {
        Self {
            temperature: m.temperature,
            humidity: m.humidity,
            timestamp_ms,
        }
    }
}

/// Physical state of the relay output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    /// The opposite state.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a sensor status message was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReason {
    /// First announcement after the broker session came up.
    Online,
    /// Periodic liveness publish.
    Heartbeat,
    /// Answer to a `STATUS` command.
    Requested,
}

impl StatusReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Heartbeat => "heartbeat",
            Self::Requested => "requested",
        }
    }
}

/// Confirmation published by the relay core after every handled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    /// State read back from the hardware; falls back to the last known state.
    pub state: RelayState,
    /// State asked for by the command, `None` for `STATUS`/heartbeat.
    pub requested: Option<RelayState>,
    /// Sequence number of the last handled command.
    pub seq: u32,
    pub fault: Option<&'static str>,
}

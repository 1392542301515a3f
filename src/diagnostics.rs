//! Runtime diagnostics counters.
//!
//! Each node core owns one [`NodeDiagnostics`] and bumps it as it goes.
//! The counters are reported in the sensor status payload and logged by
//! the runtime on shutdown; they are never persisted.

use serde::{Deserialize, Serialize};

/// Monotonic event counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDiagnostics {
    /// Sensor acquisitions that returned an error.
    pub sensor_failures: u32,
    /// Publishes the transport refused.
    pub publish_failures: u32,
    /// Successful publishes of any kind.
    pub publishes: u32,
    /// Inbound payloads that were not a command, or not one this node handles.
    pub rejected_commands: u32,
    /// Link events lost because the inbox was full.
    pub dropped_events: u32,
    /// Relay actuations that failed or read back wrong.
    pub actuation_faults: u32,
}

impl NodeDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_publish(&mut self, ok: bool) {
        if ok {
            self.publishes = self.publishes.saturating_add(1);
        } else {
            self.publish_failures = self.publish_failures.saturating_add(1);
        }
    }

    pub fn record_sensor_failure(&mut self) {
        self.sensor_failures = self.sensor_failures.saturating_add(1);
    }

    pub fn record_rejected_command(&mut self) {
        self.rejected_commands = self.rejected_commands.saturating_add(1);
    }

    pub fn record_actuation_fault(&mut self) {
        self.actuation_faults = self.actuation_faults.saturating_add(1);
    }

    /// Fold in the inbox drop count (owned by the channel, not the core).
    pub fn set_dropped_events(&mut self, dropped: u32) {
        self.dropped_events = dropped;
    }
}

/// Free heap in bytes, when the platform can report it.
#[cfg(target_os = "espidf")]
pub fn heap_free() -> Option<u32> {
    // SAFETY: read-only query of the allocator's counters.
    Some(unsafe { esp_idf_svc::sys::esp_get_free_heap_size() })
}

#[cfg(not(target_os = "espidf"))]
pub fn heap_free() -> Option<u32> {
    None
}

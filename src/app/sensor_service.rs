//! Sensor node core.
//!
//! [`SensorNode`] owns the sensor port and decides when a reading is worth
//! a `data` publish. The transport and the current time are injected per
//! call, so the whole state machine runs under test with mocks.
//!
//! ```text
//!            reading tick / READ
//!   Idle ──────────────────────▶ Sampling ──err──▶ Idle
//!    ▲                              │ ok
//!    │                              ▼
//!    └──── suppressed ────────── Evaluating
//!    │                              │ threshold | interval | cold start | READ
//!    │                              ▼
//!    └─────────────────────────  Publishing
//! ```
//!
//! Heartbeat `status` publishes run on their own deadline, independent of
//! the reading pipeline.

use log::{debug, info, warn};

use crate::config::{DeviceIdentity, NodeConfig, NodeRole, ThresholdPolicy};
use crate::diagnostics::{self, NodeDiagnostics};
use crate::mqtt::codec::{self, LastReading, ReadingPayload, StatusPayload};
use crate::mqtt::topics::{NodeTopics, parse_topic};
use crate::scheduler::{self, Periodic};

use super::commands::Command;
use super::events::{SensorReading, StatusReason};
use super::node::{NodeCore, publish_encoded};
use super::ports::{SensorPort, TransportPort};

/// Where the reading pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorPhase {
    Idle,
    Sampling,
    Evaluating,
    Publishing,
}

/// Threshold rule: publish if either quantity moved by at least its delta,
/// or if nothing was ever published.
pub fn exceeds_threshold(
    policy: &ThresholdPolicy,
    last: Option<&SensorReading>,
    next: &SensorReading,
) -> bool {
    match last {
        None => true,
        Some(prev) => {
            (next.temperature - prev.temperature).abs() >= policy.temp_delta
                || (next.humidity - prev.humidity).abs() >= policy.humid_delta
        }
    }
}

/// The sensor node state machine.
pub struct SensorNode<S: SensorPort> {
    sensor: S,
    identity: DeviceIdentity,
    topics: NodeTopics,
    thresholds: ThresholdPolicy,
    data_send_interval_ms: u64,

    phase: SensorPhase,
    sample: Periodic,
    heartbeat: Periodic,

    /// Last reading the transport accepted on `data`.
    last_published: Option<SensorReading>,
    last_publish_ms: Option<u64>,
    /// Reading that qualified for publish but was not delivered yet.
    /// Only the latest one is kept.
    pending: Option<SensorReading>,
    /// Raised by `READ`; several requests before the next poll collapse into one.
    read_requested: bool,

    connected: bool,
    subscribed: bool,
    diag: NodeDiagnostics,
}

impl<S: SensorPort> SensorNode<S> {
    pub fn new(config: &NodeConfig, sensor: S) -> Self {
        if config.role != NodeRole::Sensor {
            warn!(
                "{} configured as {}, running sensor core anyway",
                config.identity.id(),
                config.role
            );
        }
        Self {
            sensor,
            identity: config.identity.clone(),
            topics: NodeTopics::new(NodeRole::Sensor, config.identity.id()),
            thresholds: config.thresholds,
            data_send_interval_ms: u64::from(config.timing.data_send_interval_ms),
            phase: SensorPhase::Idle,
            sample: Periodic::new("sample", config.timing.reading_interval_ms),
            heartbeat: Periodic::new("heartbeat", config.timing.heartbeat_interval_ms),
            last_published: None,
            last_publish_ms: None,
            pending: None,
            read_requested: false,
            connected: false,
            subscribed: false,
            diag: NodeDiagnostics::new(),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> SensorPhase {
        self.phase
    }

    pub fn last_published(&self) -> Option<&SensorReading> {
        self.last_published.as_ref()
    }

    pub fn pending(&self) -> Option<&SensorReading> {
        self.pending.as_ref()
    }

    pub fn read_requested(&self) -> bool {
        self.read_requested
    }

    pub fn topics(&self) -> &NodeTopics {
        &self.topics
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    // ── Command handling ──────────────────────────────────────

    /// Act on a decoded command.
    pub fn handle_command(&mut self, cmd: Command, tx: &mut impl TransportPort, now_ms: u64) {
        match cmd {
            Command::Read => {
                if self.read_requested {
                    debug!("READ already pending, coalesced");
                } else {
                    info!("READ requested");
                }
                self.read_requested = true;
            }
            Command::Status => {
                self.publish_status(tx, now_ms, StatusReason::Requested);
            }
            Command::Info => {
                self.publish_info(tx);
            }
            Command::On | Command::Off | Command::Toggle => {
                warn!("{} is a relay command, ignored by sensor node", cmd);
                self.diag.record_rejected_command();
            }
        }
    }

    // ── Reading pipeline ──────────────────────────────────────

    fn set_phase(&mut self, next: SensorPhase) {
        if self.phase != next {
            debug!("sensor phase {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
    }

    /// One `Idle → Sampling → Evaluating → (Publishing | Idle)` pass.
    fn run_cycle(&mut self, tx: &mut impl TransportPort, now_ms: u64, forced: bool) {
        self.set_phase(SensorPhase::Sampling);
        let reading = match self.sensor.sample() {
            Ok(m) => SensorReading::new(m, now_ms),
            Err(e) => {
                warn!("sensor read failed: {}", e);
                self.diag.record_sensor_failure();
                // A READ answer must be a fresh sample, so a failed forced
                // read publishes nothing. Otherwise give an undelivered
                // reading another go.
                if forced {
                    warn!("READ not answered: no fresh sample");
                } else if let Some(p) = self.pending {
                    self.try_publish_reading(tx, p, now_ms);
                }
                self.set_phase(SensorPhase::Idle);
                return;
            }
        };
        debug!(
            "sampled {:.1}\u{00b0}C {:.1}%",
            reading.temperature, reading.humidity
        );

        self.set_phase(SensorPhase::Evaluating);
        let interval_elapsed = self
            .last_publish_ms
            .is_some_and(|t| now_ms.saturating_sub(t) >= self.data_send_interval_ms);
        let publish = forced
            || self.pending.is_some()
            || interval_elapsed
            || exceeds_threshold(&self.thresholds, self.last_published.as_ref(), &reading);

        if publish {
            self.try_publish_reading(tx, reading, now_ms);
        } else {
            debug!("change below threshold, suppressed");
        }
        self.set_phase(SensorPhase::Idle);
    }

    fn try_publish_reading(&mut self, tx: &mut impl TransportPort, reading: SensorReading, now_ms: u64) {
        self.set_phase(SensorPhase::Publishing);
        if !self.connected {
            debug!("offline, holding reading");
            self.pending = Some(reading);
            return;
        }
        let rssi = tx.signal_strength();
        let payload = codec::encode_reading(&ReadingPayload::new(&self.identity, &reading, rssi, now_ms));
        if publish_encoded(tx, &mut self.diag, &self.topics.data, payload, false) {
            info!(
                "data {:.1}\u{00b0}C {:.1}% published",
                reading.temperature, reading.humidity
            );
            self.last_published = Some(reading);
            self.last_publish_ms = Some(now_ms);
            self.pending = None;
        } else {
            self.pending = Some(reading);
        }
    }

    // ── Status / info ─────────────────────────────────────────

    fn publish_status(&mut self, tx: &mut impl TransportPort, now_ms: u64, reason: StatusReason) -> bool {
        let payload = codec::encode_status(&StatusPayload {
            device_id: self.identity.id(),
            status: "online",
            reason: reason.as_str(),
            uptime: now_ms / 1000,
            rssi: tx.signal_strength(),
            heap_free: diagnostics::heap_free(),
            diagnostics: self.diag,
            last_reading: self.last_published.as_ref().map(LastReading::from),
        });
        publish_encoded(tx, &mut self.diag, &self.topics.status, payload, false)
    }

    fn publish_info(&mut self, tx: &mut impl TransportPort) -> bool {
        let payload = codec::encode_info(&self.identity, NodeRole::Sensor);
        publish_encoded(tx, &mut self.diag, &self.topics.info, payload, true)
    }

    fn ensure_subscribed(&mut self, tx: &mut impl TransportPort) {
        if self.subscribed {
            return;
        }
        match tx.subscribe(&self.topics.command) {
            Ok(()) => {
                info!("subscribed to {}", self.topics.command);
                self.subscribed = true;
            }
            Err(e) => warn!("subscribe to {} failed: {}", self.topics.command, e),
        }
    }
}

impl<S: SensorPort> NodeCore for SensorNode<S> {
    fn on_connected(&mut self, tx: &mut impl TransportPort, now_ms: u64) {
        info!("{} connected", self.identity.id());
        self.connected = true;
        self.subscribed = false;
        self.ensure_subscribed(tx);
        self.publish_info(tx);
        if self.publish_status(tx, now_ms, StatusReason::Online) {
            self.heartbeat.mark(now_ms);
        }
    }

    fn on_disconnected(&mut self) {
        warn!("{} disconnected", self.identity.id());
        self.connected = false;
        self.subscribed = false;
    }

    fn on_message(&mut self, topic: &str, payload: &[u8], tx: &mut impl TransportPort, now_ms: u64) {
        let ours = parse_topic(topic).is_some_and(|t| t.is_command_for(NodeRole::Sensor, self.identity.id()));
        if !ours {
            debug!("ignoring message on {}", topic);
            return;
        }
        match codec::decode_command(payload) {
            Ok(cmd) => self.handle_command(cmd, tx, now_ms),
            Err(e) => {
                warn!("{} ({} B payload) dropped", e, payload.len());
                self.diag.record_rejected_command();
            }
        }
    }

    fn poll(&mut self, tx: &mut impl TransportPort, now_ms: u64) -> u64 {
        if self.connected {
            self.ensure_subscribed(tx);
        }

        if self.read_requested || self.sample.due(now_ms) {
            let forced = core::mem::take(&mut self.read_requested);
            self.run_cycle(tx, now_ms, forced);
            // Re-arm from now, so a forced sample is not followed by a
            // periodic duplicate.
            self.sample.mark(now_ms);
        }

        if self.connected && self.heartbeat.due(now_ms) {
            if self.publish_status(tx, now_ms, StatusReason::Heartbeat) {
                self.heartbeat.mark(now_ms);
            } else {
                self.heartbeat.defer(now_ms, self.sample.interval_ms());
            }
        }

        if self.connected {
            scheduler::next_wakeup(now_ms, &[&self.sample, &self.heartbeat])
        } else {
            self.sample.remaining(now_ms)
        }
    }

    fn diagnostics(&self) -> &NodeDiagnostics {
        &self.diag
    }

    fn diagnostics_mut(&mut self) -> &mut NodeDiagnostics {
        &mut self.diag
    }
}

//! Relay node core.
//!
//! [`RelayNode`] owns the relay output and turns `ON` / `OFF` / `TOGGLE`
//! commands into a physical actuation followed by a confirmation on the
//! `status` topic.
//!
//! ```text
//!            ON / TOGGLE
//!   ┌─────┐ ───────────▶ ┌────┐
//!   │ Off │              │ On │
//!   └─────┘ ◀─────────── └────┘
//!            OFF / TOGGLE
//! ```
//!
//! ## Confirmation contract
//!
//! - The output is driven *before* anything is published.
//! - The confirmation carries the state read back from the hardware, never
//!   the requested one taken on faith. A failed or mismatched actuation is
//!   reported with a `fault` string.
//! - Every handled command bumps the sequence number by exactly one.
//!   Heartbeats re-publish the current status without bumping it.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{DeviceIdentity, NodeConfig, NodeRole};
use crate::diagnostics::NodeDiagnostics;
use crate::error::ActuatorError;
use crate::mqtt::codec;
use crate::mqtt::topics::{NodeTopics, parse_topic};
use crate::scheduler::{self, Periodic};

use super::commands::Command;
use super::events::{RelayReport, RelayState};
use super::node::{NodeCore, publish_encoded};
use super::ports::{RelayPort, StoragePort, TransportPort};

const STORE_NAMESPACE: &str = "relay";
const STORE_KEY: &str = "state";

/// Delay before re-sending a confirmation the transport refused.
pub const STATUS_RETRY_MS: u32 = 1_000;

/// Record kept in storage when state restore is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRelay {
    pub state: RelayState,
    pub seq: u32,
}

impl PersistedRelay {
    /// Read the record back; a missing or corrupt one yields `None`.
    pub fn load(store: &dyn StoragePort) -> Option<Self> {
        let mut buf = [0u8; 16];
        let len = store.read(STORE_NAMESPACE, STORE_KEY, &mut buf).ok()?;
        match postcard::from_bytes(&buf[..len]) {
            Ok(rec) => Some(rec),
            Err(_) => {
                warn!("stored relay state is corrupt, ignoring");
                None
            }
        }
    }

    pub fn save(&self, store: &mut dyn StoragePort) {
        match postcard::to_allocvec(self) {
            Ok(bytes) => {
                if let Err(e) = store.write(STORE_NAMESPACE, STORE_KEY, &bytes) {
                    warn!("relay state save failed: {}", e);
                }
            }
            Err(_) => error!("relay state encoding failed"),
        }
    }
}

/// The relay node state machine.
pub struct RelayNode<R: RelayPort> {
    relay: R,
    identity: DeviceIdentity,
    topics: NodeTopics,

    /// Last state we know the output to be in.
    state: RelayState,
    seq: u32,
    /// Fault of the last actuation, cleared by the next successful one.
    fault: Option<&'static str>,

    heartbeat: Periodic,
    retry: Periodic,
    /// Confirmation the transport refused; only the latest is kept.
    pending_status: Option<RelayReport>,

    store: Option<Box<dyn StoragePort>>,
    connected: bool,
    subscribed: bool,
    diag: NodeDiagnostics,
}

impl<R: RelayPort> RelayNode<R> {
    /// Volatile relay: starts `Off`.
    pub fn new(config: &NodeConfig, relay: R) -> Self {
        Self::build(config, relay, None)
    }

    /// Relay whose state and sequence survive a reboot when
    /// `relay.restore_state` is set. The record is rewritten on every
    /// sequence bump, faulted or not.
    pub fn with_storage(config: &NodeConfig, relay: R, store: Box<dyn StoragePort>) -> Self {
        Self::build(config, relay, Some(store))
    }

    fn build(config: &NodeConfig, relay: R, store: Option<Box<dyn StoragePort>>) -> Self {
        if config.role != NodeRole::Relay {
            warn!(
                "{} configured as {}, running relay core anyway",
                config.identity.id(),
                config.role
            );
        }
        let store = store.filter(|_| config.relay.restore_state);
        let restored = store.as_deref().and_then(PersistedRelay::load);
        let (state, seq) = restored.map_or((RelayState::Off, 0), |r| {
            info!("restored relay {} (seq {})", r.state, r.seq);
            (r.state, r.seq)
        });

        let mut node = Self {
            relay,
            identity: config.identity.clone(),
            topics: NodeTopics::new(NodeRole::Relay, config.identity.id()),
            state,
            seq,
            fault: None,
            heartbeat: Periodic::new("heartbeat", config.timing.heartbeat_interval_ms),
            retry: Periodic::new("status retry", STATUS_RETRY_MS),
            pending_status: None,
            store,
            connected: false,
            subscribed: false,
            diag: NodeDiagnostics::new(),
        };
        // Bring the output to the known state before the first command.
        if let Err(e) = node.relay.drive(state) {
            error!("initial relay drive failed: {}", e);
            node.fault = Some(fault_text(e));
            node.diag.record_actuation_fault();
        }
        node
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn fault(&self) -> Option<&'static str> {
        self.fault
    }

    pub fn pending_status(&self) -> Option<&RelayReport> {
        self.pending_status.as_ref()
    }

    pub fn topics(&self) -> &NodeTopics {
        &self.topics
    }

    pub fn relay_mut(&mut self) -> &mut R {
        &mut self.relay
    }

    /// Current status as it would be published by a heartbeat.
    pub fn report(&mut self) -> RelayReport {
        RelayReport {
            state: self.observed(),
            requested: None,
            seq: self.seq,
            fault: self.fault,
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Act on a decoded command and publish its confirmation.
    ///
    /// Returns the confirmation, or `None` if this node does not handle
    /// the command.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        tx: &mut impl TransportPort,
        now_ms: u64,
    ) -> Option<RelayReport> {
        let requested = match cmd {
            Command::On => Some(RelayState::On),
            Command::Off => Some(RelayState::Off),
            Command::Toggle => Some(self.observed().toggled()),
            Command::Status | Command::Info => None,
            Command::Read => {
                warn!("READ is a sensor command, ignored by relay node");
                self.diag.record_rejected_command();
                return None;
            }
        };

        self.seq = self.seq.wrapping_add(1);
        if let Some(target) = requested {
            self.actuate(target);
        }
        self.persist();
        if cmd == Command::Info {
            self.publish_info(tx);
        }

        let report = RelayReport {
            state: self.state,
            requested,
            seq: self.seq,
            fault: self.fault,
        };
        info!(
            "{} #{} -> {}{}",
            cmd,
            report.seq,
            report.state,
            report.fault.map_or(String::new(), |f| format!(" (fault: {f})"))
        );
        self.publish_report(tx, report, now_ms);
        Some(report)
    }

    /// Drive the output, then settle `state` on what the hardware reports.
    fn actuate(&mut self, target: RelayState) {
        match self.relay.drive(target) {
            Ok(()) => match self.relay.observe() {
                Some(seen) if seen != target => {
                    warn!("relay commanded {} but reads {}", target, seen);
                    self.state = seen;
                    self.fault = Some(fault_text(ActuatorError::ReadbackMismatch));
                    self.diag.record_actuation_fault();
                }
                _ => {
                    self.state = target;
                    self.fault = None;
                }
            },
            Err(e) => {
                error!("relay drive to {} failed: {}", target, e);
                self.state = self.relay.observe().unwrap_or(self.state);
                self.fault = Some(fault_text(e));
                self.diag.record_actuation_fault();
            }
        }
    }

    /// Record `{state, seq}` so a reboot never reuses a published number.
    fn persist(&mut self) {
        if let Some(store) = self.store.as_deref_mut() {
            PersistedRelay {
                state: self.state,
                seq: self.seq,
            }
            .save(store);
        }
    }

    /// Hardware read-back, falling back to the last known state.
    fn observed(&mut self) -> RelayState {
        self.relay.observe().unwrap_or(self.state)
    }

    // ── Publishing ────────────────────────────────────────────

    fn publish_report(&mut self, tx: &mut impl TransportPort, report: RelayReport, now_ms: u64) -> bool {
        if !self.connected {
            self.pending_status = Some(report);
            return false;
        }
        let payload = codec::encode_relay_status(self.identity.id(), &report);
        if publish_encoded(tx, &mut self.diag, &self.topics.status, payload, true) {
            self.pending_status = None;
            true
        } else {
            self.pending_status = Some(report);
            self.retry.mark(now_ms);
            false
        }
    }

    fn publish_info(&mut self, tx: &mut impl TransportPort) -> bool {
        let payload = codec::encode_info(&self.identity, NodeRole::Relay);
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

fn fault_text(e: ActuatorError) -> &'static str {
    match e {
        ActuatorError::GpioWriteFailed => "GPIO write failed",
        ActuatorError::ReadbackMismatch => "output readback mismatch",
    }
}

impl<R: RelayPort> NodeCore for RelayNode<R> {
    fn on_connected(&mut self, tx: &mut impl TransportPort, now_ms: u64) {
        info!("{} connected", self.identity.id());
        self.connected = true;
        self.subscribed = false;
        self.ensure_subscribed(tx);
        self.publish_info(tx);
        // A held confirmation is superseded by the current status.
        let report = match self.pending_status.take() {
            Some(p) => RelayReport {
                state: self.observed(),
                ..p
            },
            None => self.report(),
        };
        if self.publish_report(tx, report, now_ms) {
            self.heartbeat.mark(now_ms);
        }
    }

    fn on_disconnected(&mut self) {
        warn!("{} disconnected", self.identity.id());
        self.connected = false;
        self.subscribed = false;
    }

    fn on_message(&mut self, topic: &str, payload: &[u8], tx: &mut impl TransportPort, now_ms: u64) {
        let ours = parse_topic(topic).is_some_and(|t| t.is_command_for(NodeRole::Relay, self.identity.id()));
        if !ours {
            debug!("ignoring message on {}", topic);
            return;
        }
        match codec::decode_command(payload) {
            Ok(cmd) => {
                self.handle_command(cmd, tx, now_ms);
            }
            Err(e) => {
                warn!("{} ({} B payload) dropped", e, payload.len());
                self.diag.record_rejected_command();
            }
        }
    }

    fn poll(&mut self, tx: &mut impl TransportPort, now_ms: u64) -> u64 {
        if !self.connected {
            return self.heartbeat.interval_ms();
        }
        self.ensure_subscribed(tx);

        if let Some(report) = self.pending_status {
            if self.retry.due(now_ms) {
                debug!("retrying confirmation #{}", report.seq);
                self.publish_report(tx, report, now_ms);
            }
        }

        if self.heartbeat.due(now_ms) {
            let report = self.report();
            if self.publish_report(tx, report, now_ms) {
                self.heartbeat.mark(now_ms);
            } else {
                self.heartbeat.defer(now_ms, u64::from(STATUS_RETRY_MS));
            }
        }

        if self.pending_status.is_some() {
            scheduler::next_wakeup(now_ms, &[&self.heartbeat, &self.retry])
        } else {
            self.heartbeat.remaining(now_ms)
        }
    }

    fn diagnostics(&self) -> &NodeDiagnostics {
        &self.diag
    }

    fn diagnostics_mut(&mut self) -> &mut NodeDiagnostics {
        &mut self.diag
    }
}

//! Integration tests for the relay node: actuation, confirmations,
//! sequence numbering, fault reporting and state restore across reboots.

use homeguard::app::events::RelayState;
use homeguard::app::node::NodeCore;
use homeguard::app::relay_service::RelayNode;
use homeguard::config::NodeConfig;
use homeguard::registry;

use crate::mock_hw::{MockRelay, RecordingTransport, SharedStorage};

const STATUS: &str = "home/relay/ESP01_RELAY_001/status";
const INFO: &str = "home/relay/ESP01_RELAY_001/info";
const COMMAND: &str = "home/relay/ESP01_RELAY_001/command";

fn config() -> NodeConfig {
    registry::lookup("ESP01_RELAY_001")
        .expect("registered relay")
        .to_config()
}

fn online(relay: MockRelay) -> (RelayNode<MockRelay>, RecordingTransport) {
    let mut node = RelayNode::new(&config(), relay);
    let mut tx = RecordingTransport::new();
    node.on_connected(&mut tx, 0);
    tx.clear();
    (node, tx)
}

fn send(node: &mut RelayNode<MockRelay>, tx: &mut RecordingTransport, cmd: &[u8], now_ms: u64) -> serde_json::Value {
    node.on_message(COMMAND, cmd, tx, now_ms);
    tx.last_on(STATUS).expect("confirmation published").json()
}

// ── Startup ──────────────────────────────────────────────────

#[test]
fn starts_off_and_announces_state() {
    let mut node = RelayNode::new(&config(), MockRelay::new());
    assert_eq!(node.relay_mut().drives, vec![RelayState::Off]);

    let mut tx = RecordingTransport::new();
    node.on_connected(&mut tx, 0);

    assert_eq!(tx.subscriptions, vec![COMMAND.to_string()]);
    assert_eq!(tx.last_on(INFO).unwrap().json()["role"], "relay");
    let status = tx.last_on(STATUS).unwrap();
    assert!(status.retain);
    let v = status.json();
    assert_eq!(v["state"], "OFF");
    assert_eq!(v["seq"], 0);
    assert!(v.get("fault").is_none());
}

// ── Commands ─────────────────────────────────────────────────

#[test]
fn on_twice_confirms_twice_with_increasing_seq() {
    let (mut node, mut tx) = online(MockRelay::new());

    let first = send(&mut node, &mut tx, b"ON", 100);
    let second = send(&mut node, &mut tx, b"ON", 200);

    assert_eq!(first["state"], "ON");
    assert_eq!(first["requested"], "ON");
    assert_eq!(first["seq"], 1);
    assert_eq!(second["state"], "ON");
    assert_eq!(second["seq"], 2);
    assert_eq!(tx.on(STATUS).len(), 2);
    assert_eq!(node.state(), RelayState::On);
}

#[test]
fn toggle_flips_the_observed_state() {
    let (mut node, mut tx) = online(MockRelay::new());

    assert_eq!(send(&mut node, &mut tx, b"TOGGLE", 100)["state"], "ON");
    assert_eq!(send(&mut node, &mut tx, b"TOGGLE", 200)["state"], "OFF");
    assert_eq!(send(&mut node, &mut tx, b"OFF", 300)["state"], "OFF");
    assert_eq!(node.seq(), 3);
}

#[test]
fn status_and_info_confirm_without_actuating() {
    let (mut node, mut tx) = online(MockRelay::new());
    let drives_before = node.relay_mut().drives.len();

    let status = send(&mut node, &mut tx, b"STATUS", 100);
    assert_eq!(status["seq"], 1);
    assert!(status.get("requested").is_none());

    let info = send(&mut node, &mut tx, b"INFO", 200);
    assert_eq!(info["seq"], 2);
    assert_eq!(tx.on(INFO).len(), 1);
    assert_eq!(node.relay_mut().drives.len(), drives_before);
}

#[test]
fn read_and_garbage_are_rejected_without_seq_bump() {
    let (mut node, mut tx) = online(MockRelay::new());

    node.on_message(COMMAND, b"READ", &mut tx, 100);
    node.on_message(COMMAND, b"on", &mut tx, 100);
    node.on_message(COMMAND, &[0xff, 0x00], &mut tx, 100);

    assert!(tx.published.is_empty());
    assert_eq!(node.seq(), 0);
    assert_eq!(node.diagnostics().rejected_commands, 3);
}

// ── Faults ───────────────────────────────────────────────────

#[test]
fn stuck_output_reports_the_real_level() {
    let (mut node, mut tx) = online(MockRelay::stuck_at(RelayState::Off));

    let v = send(&mut node, &mut tx, b"ON", 100);

    assert_eq!(v["state"], "OFF");
    assert_eq!(v["requested"], "ON");
    assert_eq!(v["fault"], "output readback mismatch");
    assert_eq!(node.diagnostics().actuation_faults, 1);
}

#[test]
fn write_failure_reports_fault_then_clears_on_success() {
    let (mut node, mut tx) = online(MockRelay::new());
    node.relay_mut().fail_writes = true;

    let failed = send(&mut node, &mut tx, b"ON", 100);
    assert_eq!(failed["state"], "OFF");
    assert_eq!(failed["fault"], "GPIO write failed");

    node.relay_mut().fail_writes = false;
    let ok = send(&mut node, &mut tx, b"ON", 200);
    assert_eq!(ok["state"], "ON");
    assert!(ok.get("fault").is_none());
    assert!(node.fault().is_none());
}

// ── Delivery ─────────────────────────────────────────────────

#[test]
fn rejected_confirmation_is_retried_after_a_second() {
    let (mut node, mut tx) = online(MockRelay::new());
    tx.reject_publish = true;
    node.on_message(COMMAND, b"ON", &mut tx, 0);
    assert_eq!(node.pending_status().map(|r| r.seq), Some(1));

    tx.reject_publish = false;
    node.poll(&mut tx, 500);
    assert!(tx.on(STATUS).is_empty());

    node.poll(&mut tx, 1_000);
    let v = tx.last_on(STATUS).unwrap().json();
    assert_eq!(v["seq"], 1);
    assert_eq!(v["state"], "ON");
    assert!(node.pending_status().is_none());
}

#[test]
fn command_while_offline_is_confirmed_on_reconnect() {
    let mut node = RelayNode::new(&config(), MockRelay::new());
    let mut tx = RecordingTransport::new();

    node.handle_command(homeguard::app::commands::Command::On, &mut tx, 0);
    assert!(tx.published.is_empty());
    assert_eq!(node.state(), RelayState::On);

    node.on_connected(&mut tx, 5_000);
    let statuses = tx.on(STATUS);
    assert_eq!(statuses.len(), 1, "held confirmation superseded, not duplicated");
    let v = statuses[0].json();
    assert_eq!(v["state"], "ON");
    assert_eq!(v["seq"], 1);
}

#[test]
fn heartbeat_republishes_without_bumping_seq() {
    let (mut node, mut tx) = online(MockRelay::new());
    send(&mut node, &mut tx, b"ON", 100);
    tx.clear();

    node.poll(&mut tx, 29_999);
    assert!(tx.on(STATUS).is_empty());
    node.poll(&mut tx, 30_000);

    let v = tx.last_on(STATUS).unwrap().json();
    assert_eq!(v["state"], "ON");
    assert_eq!(v["seq"], 1);
}

// ── Persistence ──────────────────────────────────────────────

#[test]
fn state_and_seq_survive_a_reboot_when_enabled() {
    let mut cfg = config();
    cfg.relay.restore_state = true;
    let flash = SharedStorage::new();

    {
        let mut node = RelayNode::with_storage(&cfg, MockRelay::new(), Box::new(flash.clone()));
        let mut tx = RecordingTransport::new();
        node.on_connected(&mut tx, 0);
        node.on_message(COMMAND, b"ON", &mut tx, 100);
        node.on_message(COMMAND, b"STATUS", &mut tx, 200);
        node.on_message(COMMAND, b"INFO", &mut tx, 300);
        assert_eq!(node.seq(), 3);
    }

    let mut node = RelayNode::with_storage(&cfg, MockRelay::new(), Box::new(flash.clone()));
    assert_eq!(node.state(), RelayState::On);
    assert_eq!(node.seq(), 3);
    assert_eq!(node.relay_mut().drives, vec![RelayState::On]);

    let mut tx = RecordingTransport::new();
    node.on_connected(&mut tx, 0);
    assert_eq!(send(&mut node, &mut tx, b"STATUS", 10)["seq"], 4);
}

#[test]
fn faulted_actuation_still_advances_the_stored_seq() {
    let mut cfg = config();
    cfg.relay.restore_state = true;
    let flash = SharedStorage::new();

    {
        let mut node = RelayNode::with_storage(&cfg, MockRelay::stuck_at(RelayState::Off), Box::new(flash.clone()));
        let mut tx = RecordingTransport::new();
        node.on_connected(&mut tx, 0);
        let confirmation = send(&mut node, &mut tx, b"ON", 100);
        assert_eq!(confirmation["seq"], 1);
        assert_eq!(confirmation["fault"], "output readback mismatch");
    }

    let node = RelayNode::with_storage(&cfg, MockRelay::new(), Box::new(flash));
    assert_eq!(node.seq(), 1);
    assert_eq!(node.state(), RelayState::Off);
}

#[test]
fn storage_is_ignored_when_restore_is_disabled() {
    let cfg = config();
    assert!(!cfg.relay.restore_state);
    let flash = SharedStorage::new();

    let mut node = RelayNode::with_storage(&cfg, MockRelay::new(), Box::new(flash.clone()));
    let mut tx = RecordingTransport::new();
    node.on_connected(&mut tx, 0);
    node.on_message(COMMAND, b"ON", &mut tx, 100);

    assert_eq!(flash.keys(), 0);
}

//! Integration tests for the sensor node: sampling, threshold filtering,
//! READ handling and heartbeats, driven through the `NodeCore` surface
//! exactly as the runtime drives it.

use homeguard::app::node::NodeCore;
use homeguard::app::sensor_service::SensorNode;
use homeguard::config::NodeConfig;
use homeguard::error::SensorError;
use homeguard::registry;

use crate::mock_hw::{RecordingTransport, ScriptedSensor};

const DATA: &str = "home/sensor/ESP01_DHT11_001/data";
const STATUS: &str = "home/sensor/ESP01_DHT11_001/status";
const INFO: &str = "home/sensor/ESP01_DHT11_001/info";
const COMMAND: &str = "home/sensor/ESP01_DHT11_001/command";

fn config() -> NodeConfig {
    registry::DEFAULT_SENSOR.to_config()
}

fn online(sensor: ScriptedSensor) -> (SensorNode<ScriptedSensor>, RecordingTransport) {
    let mut node = SensorNode::new(&config(), sensor);
    let mut tx = RecordingTransport::new();
    node.on_connected(&mut tx, 0);
    (node, tx)
}

fn temperature_of(p: &crate::mock_hw::Published) -> f64 {
    p.json()["temperature"].as_f64().expect("temperature field")
}

// ── Connection ───────────────────────────────────────────────

#[test]
fn connect_subscribes_and_announces() {
    let (_node, tx) = online(ScriptedSensor::steady(21.0, 40.0));

    assert_eq!(tx.subscriptions, vec![COMMAND.to_string()]);

    let info = tx.last_on(INFO).expect("info published");
    assert!(info.retain);
    let info = info.json();
    assert_eq!(info["role"], "sensor");
    assert_eq!(info["sensor_type"], "DHT11");
    assert_eq!(info["device_name"], "Monitor Sala");

    let status = tx.last_on(STATUS).expect("status published").json();
    assert_eq!(status["status"], "online");
    assert_eq!(status["reason"], "online");
}

// ── Threshold filtering ──────────────────────────────────────

#[test]
fn small_changes_are_suppressed_until_threshold() {
    let sensor = ScriptedSensor::new()
        .then(20.0, 50.0)
        .then(20.3, 50.0)
        .then(20.6, 50.0);
    let (mut node, mut tx) = online(sensor);

    node.poll(&mut tx, 0);
    node.poll(&mut tx, 5_000);
    node.poll(&mut tx, 10_000);

    let data = tx.on(DATA);
    assert_eq!(data.len(), 2, "first and third readings only");
    assert!((temperature_of(data[0]) - 20.0).abs() < 1e-3);
    assert!((temperature_of(data[1]) - 20.6).abs() < 1e-3);
    assert_eq!(node.sensor_mut().samples, 3);
}

#[test]
fn humidity_delta_on_boundary_publishes() {
    let sensor = ScriptedSensor::new().then(22.0, 50.0).then(22.0, 52.0);
    let (mut node, mut tx) = online(sensor);

    node.poll(&mut tx, 0);
    node.poll(&mut tx, 5_000);

    assert_eq!(tx.on(DATA).len(), 2);
}

#[test]
fn unchanged_readings_still_publish_every_data_interval() {
    let (mut node, mut tx) = online(ScriptedSensor::steady(21.0, 40.0));

    for t in (0..=60_000).step_by(5_000) {
        node.poll(&mut tx, t);
    }

    let data = tx.on(DATA);
    assert_eq!(data.len(), 2);
    assert_eq!(data[1].json()["timestamp"], 60_000);
}

#[test]
fn reading_payload_carries_identity_and_link_quality() {
    let mut node = SensorNode::new(&config(), ScriptedSensor::steady(19.5, 61.0));
    let mut tx = RecordingTransport {
        rssi: Some(-61),
        ..RecordingTransport::new()
    };
    node.on_connected(&mut tx, 0);
    node.poll(&mut tx, 2_000);

    let p = tx.last_on(DATA).expect("reading published");
    assert!(!p.retain);
    let v = p.json();
    assert_eq!(v["device_id"], "ESP01_DHT11_001");
    assert_eq!(v["location"], "Sala");
    assert_eq!(v["sensor_type"], "DHT11");
    assert_eq!(v["rssi"], -61);
    assert_eq!(v["uptime"], 2);
}

// ── READ ─────────────────────────────────────────────────────

#[test]
fn repeated_read_requests_collapse_into_one_publish() {
    let (mut node, mut tx) = online(ScriptedSensor::steady(21.0, 40.0));
    node.poll(&mut tx, 0);
    assert_eq!(tx.on(DATA).len(), 1);

    for _ in 0..3 {
        node.on_message(COMMAND, b"READ", &mut tx, 1_000);
    }
    assert!(node.read_requested());
    node.poll(&mut tx, 1_000);

    assert!(!node.read_requested());
    assert_eq!(tx.on(DATA).len(), 2, "forced publish despite no change");
    assert_eq!(node.sensor_mut().samples, 2);

    // The forced sample re-armed the cadence: nothing due at the old slot.
    node.poll(&mut tx, 5_000);
    assert_eq!(node.sensor_mut().samples, 2);
    node.poll(&mut tx, 6_000);
    assert_eq!(node.sensor_mut().samples, 3);
    assert_eq!(tx.on(DATA).len(), 2);
}

// ── Heartbeat / STATUS ───────────────────────────────────────

#[test]
fn heartbeat_within_thirty_seconds() {
    let (mut node, mut tx) = online(ScriptedSensor::steady(21.0, 40.0));

    for t in (5_000..=30_000).step_by(5_000) {
        node.poll(&mut tx, t);
    }

    let reasons: Vec<String> = tx
        .on(STATUS)
        .iter()
        .map(|p| p.json()["reason"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(reasons, ["online", "heartbeat"]);
    assert_eq!(tx.last_on(STATUS).unwrap().json()["uptime"], 30);
}

#[test]
fn status_command_reports_last_reading() {
    let (mut node, mut tx) = online(ScriptedSensor::steady(23.5, 45.0));
    node.poll(&mut tx, 0);

    node.on_message(COMMAND, b"STATUS", &mut tx, 2_000);

    let v = tx.last_on(STATUS).unwrap().json();
    assert_eq!(v["reason"], "requested");
    assert!((v["last_reading"]["temperature"].as_f64().unwrap() - 23.5).abs() < 1e-3);
    assert_eq!(v["diagnostics"]["publishes"], 3);
}

// ── Failures ─────────────────────────────────────────────────

#[test]
fn sensor_failure_publishes_nothing_and_is_counted() {
    let sensor = ScriptedSensor::new()
        .then_fail(SensorError::Checksum)
        .then(20.0, 50.0);
    let (mut node, mut tx) = online(sensor);

    node.poll(&mut tx, 0);
    assert!(tx.on(DATA).is_empty());
    assert_eq!(node.diagnostics().sensor_failures, 1);

    node.poll(&mut tx, 5_000);
    assert_eq!(tx.on(DATA).len(), 1);
}

#[test]
fn offline_reading_is_held_and_superseded_by_a_fresh_one() {
    let sensor = ScriptedSensor::new().then(20.0, 50.0).then(25.0, 50.0);
    let mut node = SensorNode::new(&config(), sensor);
    let mut tx = RecordingTransport::new();

    node.poll(&mut tx, 0);
    assert!(node.pending().is_some());
    assert!(tx.published.is_empty());

    node.on_connected(&mut tx, 1_000);
    node.poll(&mut tx, 5_000);

    let data = tx.on(DATA);
    assert_eq!(data.len(), 1);
    assert!((temperature_of(data[0]) - 25.0).abs() < 1e-3);
    assert!(node.pending().is_none());
}

#[test]
fn rejected_publish_is_retried_next_cycle() {
    let (mut node, mut tx) = online(ScriptedSensor::steady(21.0, 40.0));
    tx.reject_publish = true;
    node.poll(&mut tx, 0);
    assert!(node.pending().is_some());
    assert_eq!(node.diagnostics().publish_failures, 1);

    tx.reject_publish = false;
    node.poll(&mut tx, 5_000);
    assert_eq!(tx.on(DATA).len(), 1);
    assert!(node.last_published().is_some());
}

// ── Command filtering ────────────────────────────────────────

#[test]
fn relay_and_malformed_commands_are_rejected() {
    let (mut node, mut tx) = online(ScriptedSensor::steady(21.0, 40.0));
    tx.clear();

    node.on_message(COMMAND, b"ON", &mut tx, 100);
    node.on_message(COMMAND, b"read", &mut tx, 100);
    node.on_message(COMMAND, b"READ\n", &mut tx, 100);

    assert!(tx.published.is_empty());
    assert!(!node.read_requested());
    assert_eq!(node.diagnostics().rejected_commands, 3);
}

#[test]
fn messages_on_foreign_topics_are_ignored() {
    let (mut node, mut tx) = online(ScriptedSensor::steady(21.0, 40.0));

    node.on_message("home/sensor/ESP01_DHT11_002/command", b"READ", &mut tx, 100);

    assert!(!node.read_requested());
    assert_eq!(node.diagnostics().rejected_commands, 0);
}

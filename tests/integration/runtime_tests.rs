//! End-to-end tests of the runtime loop: events arrive on the `Inbox`
//! from another thread, exactly as the MQTT client delivers them.

use std::thread;
use std::time::Duration;

use homeguard::adapters::time::MonotonicClock;
use homeguard::app::relay_service::RelayNode;
use homeguard::app::sensor_service::SensorNode;
use homeguard::mqtt::channels::{INBOX_DEPTH, Inbox, LinkEvent};
use homeguard::registry;
use homeguard::runtime::block_on_node;

use crate::mock_hw::{MockRelay, RecordingTransport, ScriptedSensor};

fn shutdown_after(inbox: &'static Inbox, delay_ms: u64) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(delay_ms));
        inbox.deliver(LinkEvent::Shutdown);
    })
}

#[test]
fn burst_of_reads_yields_a_single_reading() {
    static INBOX: Inbox = Inbox::new();
    let cmd = "home/sensor/ESP01_DHT11_001/command";
    INBOX.deliver(LinkEvent::Connected);
    INBOX.deliver_message(cmd, b"READ");
    INBOX.deliver_message(cmd, b"READ");
    INBOX.deliver_message(cmd, b"READ");
    let stopper = shutdown_after(&INBOX, 100);

    let cfg = registry::DEFAULT_SENSOR.to_config();
    let mut node = SensorNode::new(&cfg, ScriptedSensor::steady(21.0, 40.0));
    let mut tx = RecordingTransport::new();
    block_on_node(&mut node, &mut tx, &INBOX, &MonotonicClock::new());
    stopper.join().unwrap();

    assert_eq!(tx.on("home/sensor/ESP01_DHT11_001/data").len(), 1);
    assert_eq!(node.sensor_mut().samples, 1);
}

#[test]
fn command_arriving_while_idle_wakes_the_loop() {
    static INBOX: Inbox = Inbox::new();
    let cmd = "home/relay/ESP01_RELAY_002/command";
    INBOX.deliver(LinkEvent::Connected);

    let sender = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        INBOX.deliver_message(cmd, b"ON");
        thread::sleep(Duration::from_millis(30));
        INBOX.deliver(LinkEvent::Shutdown);
    });

    let cfg = registry::lookup("ESP01_RELAY_002").unwrap().to_config();
    let mut node = RelayNode::new(&cfg, MockRelay::new());
    let mut tx = RecordingTransport::new();
    block_on_node(&mut node, &mut tx, &INBOX, &MonotonicClock::new());
    sender.join().unwrap();

    let statuses = tx.on("home/relay/ESP01_RELAY_002/status");
    assert_eq!(statuses.len(), 2, "announcement plus one confirmation");
    assert_eq!(statuses[1].json()["state"], "ON");
    assert_eq!(statuses[1].json()["seq"], 1);
}

#[test]
fn connect_after_a_full_inbox_still_confirms_every_command() {
    static INBOX: Inbox = Inbox::new();
    let cmd = "home/relay/ESP01_RELAY_DEFAULT/command";
    for _ in 0..INBOX_DEPTH {
        assert!(INBOX.deliver_message(cmd, b"STATUS"));
    }
    assert!(INBOX.deliver(LinkEvent::Connected));
    INBOX.deliver(LinkEvent::Shutdown);

    let cfg = registry::DEFAULT_RELAY.to_config();
    let mut node = RelayNode::new(&cfg, MockRelay::new());
    let mut tx = RecordingTransport::new();
    block_on_node(&mut node, &mut tx, &INBOX, &MonotonicClock::new());

    let seqs: Vec<u64> = tx
        .on("home/relay/ESP01_RELAY_DEFAULT/status")
        .iter()
        .filter_map(|p| p.json()["seq"].as_u64())
        .collect();
    assert_eq!(seqs, [0, 1, 2, 3, 4, 5, 6, 7, 8]);
    assert!(node.pending_status().is_none());
    assert_eq!(INBOX.dropped(), 0);
}

//! Fuzz target: inbound command path
//!
//! Feeds arbitrary bytes to `decode_command` and, through the inbox, to a
//! relay node. Neither may panic, and a rejected payload must not move the
//! relay or its sequence number.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use homeguard::app::events::RelayState;
use homeguard::app::node::NodeCore;
use homeguard::app::ports::{RelayPort, TransportPort};
use homeguard::app::relay_service::RelayNode;
use homeguard::error::{ActuatorError, TransportError};
use homeguard::mqtt::codec::decode_command;
use homeguard::registry;
use libfuzzer_sys::fuzz_target;

struct Latch(Option<RelayState>);

impl RelayPort for Latch {
    fn drive(&mut self, state: RelayState) -> Result<(), ActuatorError> {
        self.0 = Some(state);
        Ok(())
    }
    fn observe(&mut self) -> Option<RelayState> {
        self.0
    }
}

struct Discard;

impl TransportPort for Discard {
    fn publish(&mut self, _: &str, _: &[u8], _: bool) -> Result<(), TransportError> {
        Ok(())
    }
    fn subscribe(&mut self, _: &str) -> Result<(), TransportError> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let decoded = decode_command(data);

    let cfg = registry::DEFAULT_RELAY.to_config();
    let mut node = RelayNode::new(&cfg, Latch(None));
    let mut tx = Discard;
    node.on_connected(&mut tx, 0);
    let command_topic = node.topics().command.clone();
    node.on_message(&command_topic, data, &mut tx, 1);

    if decoded.is_err() {
        assert_eq!(node.seq(), 0, "rejected payload bumped seq");
        assert_eq!(node.state(), RelayState::Off);
    }
});

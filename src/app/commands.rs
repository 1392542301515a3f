//! Inbound commands to the node cores.
//!
//! Commands arrive as the raw payload of a message on the node's
//! `command` topic and are decoded by
//! [`decode_command`](crate::mqtt::codec::decode_command). Each core
//! decides which of them it acts on; the rest are dropped with a log.

use core::fmt;

/// Every command word the network understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Publish device and connectivity state without side effects.
    Status,
    /// Sensor only: sample now and publish, bypassing thresholds.
    Read,
    /// Publish the static identity.
    Info,
    /// Relay only: energise the output.
    On,
    /// Relay only: de-energise the output.
    Off,
    /// Relay only: flip the output.
    Toggle,
}

impl Command {
    /// The exact payload bytes that select this command.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Status => "STATUS",
            Self::Read => "READ",
            Self::Info => "INFO",
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Toggle => "TOGGLE",
        }
    }

    pub const ALL: [Self; 6] = [
        Self::Status,
        Self::Read,
        Self::Info,
        Self::On,
        Self::Off,
        Self::Toggle,
    ];
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

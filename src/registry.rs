//! Deployed device table.
//!
//! Every physical node in the house has one entry here. The firmware image
//! is the same for all of them; which entry applies is chosen once at
//! startup from the `HOMEGUARD_DEVICE` build variable (or NVS), and the
//! entry is turned into a [`NodeConfig`] with default policies.

use log::warn;

use crate::config::{DeviceIdentity, NodeConfig, NodeRole};

/// Gateway of the home network all nodes join.
pub const GATEWAY: [u8; 4] = [192, 168, 18, 1];
pub const SUBNET: [u8; 4] = [255, 255, 255, 0];

/// One known node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub location: &'static str,
    pub role: NodeRole,
    /// Fixed station address handed to the Wi-Fi adapter.
    pub static_ip: [u8; 4],
}

impl RegistryEntry {
    const fn sensor(id: &'static str, name: &'static str, location: &'static str, host: u8) -> Self {
        Self {
            id,
            name,
            location,
            role: NodeRole::Sensor,
            static_ip: [192, 168, 18, host],
        }
    }

    const fn relay(id: &'static str, name: &'static str, location: &'static str, host: u8) -> Self {
        Self {
            id,
            name,
            location,
            role: NodeRole::Relay,
            static_ip: [192, 168, 18, host],
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::trusted(self.id, self.name, self.location)
    }

    /// Configuration for this node with every policy at its default.
    pub fn to_config(&self) -> NodeConfig {
        NodeConfig::new(self.identity(), self.role)
    }
}

pub const DEFAULT_SENSOR: RegistryEntry =
    RegistryEntry::sensor("ESP01_DHT11_001", "Monitor Sala", "Sala", 195);

/// Test relay used when no known device id is configured.
pub const DEFAULT_RELAY: RegistryEntry =
    RegistryEntry::relay("ESP01_RELAY_DEFAULT", "Relé de Teste", "Teste", 200);

pub const DEVICES: &[RegistryEntry] = &[
    DEFAULT_SENSOR,
    RegistryEntry::sensor("ESP01_DHT11_002", "Monitor Cozinha", "Cozinha", 196),
    RegistryEntry::sensor("ESP01_DHT11_003", "Monitor Quarto", "Quarto", 197),
    RegistryEntry::relay("ESP01_RELAY_001", "Luz da Sala", "Sala", 192),
    RegistryEntry::relay("ESP01_RELAY_002", "Luz da Cozinha", "Cozinha", 193),
    RegistryEntry::relay("ESP01_RELAY_003", "Bomba d'Água", "Externa", 194),
    RegistryEntry::relay("ESP01_RELAY_004", "Luz do Quarto", "Quarto", 195),
    RegistryEntry::relay("ESP01_RELAY_005", "Ventilador", "Sala", 196),
    DEFAULT_RELAY,
];

/// Exact lookup by device id.
pub fn lookup(id: &str) -> Option<&'static RegistryEntry> {
    DEVICES.iter().find(|d| d.id == id)
}

/// Pick the entry for `id`, falling back to the test relay.
pub fn select(id: &str) -> &'static RegistryEntry {
    match lookup(id) {
        Some(d) if d.id == DEFAULT_RELAY.id => {
            warn!("using test relay {}, configure a real device id", d.id);
            d
        }
        Some(d) => d,
        None => {
            warn!("unknown device id {:?}, using {}", id, DEFAULT_RELAY.id);
            &DEVICES[DEVICES.len() - 1]
        }
    }
}

//! GPIO assignments for the ESP-01-footprint node boards.
//!
//! Single source of truth: `main` wires drivers from these numbers and
//! nothing else hard-codes a pin. The module exposes only two usable GPIOs
//! (0 and 2); both are boot strapping pins and must idle HIGH at reset,
//! which the pull-ups on the DHT11 line and the relay input provide.

// ---------------------------------------------------------------------------
// Sensor node
// ---------------------------------------------------------------------------

/// DHT11 data line, open-drain with a 10 kΩ pull-up.
pub const DHT_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Relay node
// ---------------------------------------------------------------------------

/// Relay module input. Most ESP-01 relay boards energise on LOW; see
/// `RelayOptions::active_low`.
pub const RELAY_GPIO: i32 = 0;

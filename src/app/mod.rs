//! Application core: pure node logic, zero I/O.
//!
//! This module contains the business rules of the two HomeGuard node
//! variants: when a sensor node samples and publishes, and how a relay
//! node applies and confirms commands. All interaction with hardware and
//! the broker happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod node;
pub mod ports;
pub mod relay_service;
pub mod sensor_service;

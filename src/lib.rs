//! HomeGuard node firmware library.
//!
//! Exposes the pure-logic modules (node cores, MQTT codec, scheduler,
//! drivers) for integration testing on the host. All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod mqtt;
pub mod pins;
pub mod registry;
pub mod runtime;
pub mod scheduler;

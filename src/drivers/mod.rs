//! Peripheral drivers behind the sensor and relay ports.
//!
//! Both are generic over `embedded-hal` 1.0 traits, so the same code runs
//! on an `esp-idf-hal` `PinDriver` and on host test doubles.

pub mod dht11;
pub mod relay;

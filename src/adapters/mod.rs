//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements           | Connects to                 |
//! |------------|----------------------|-----------------------------|
//! | `mqtt`     | TransportPort        | ESP-IDF MQTT client (+ LWT) |
//! | `nvs`      | ConfigPort           | NVS / in-memory store       |
//! |            | StoragePort          |                             |
//! | `time`     | Clock                | ESP32 system timer          |
//! | `wifi`     | (startup only)       | ESP-IDF WiFi STA            |

#[cfg(target_os = "espidf")]
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;

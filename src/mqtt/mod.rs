//! MQTT topic router.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     MQTT layer                            │
//! │                                                           │
//! │  client callback ──▶ Inbox (channels) ──▶ runtime loop    │
//! │                                             │             │
//! │                         decode_command ◀────┘             │
//! │                              │                            │
//! │                              ▼                            │
//! │                        node core ──▶ codec ──▶ topics     │
//! │                                         │                 │
//! │                                         ▼                 │
//! │                                  TransportPort::publish   │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod codec;
pub mod topics;

//! Link-event inbox.
//!
//! Bridges the MQTT client's callback thread with the node's single
//! control loop. The callback side never blocks.
//!
//! - Inbound messages go through an `embassy-sync` bounded channel; when
//!   it is full the message is dropped with a warning and counted.
//! - Link changes (`Connected` / `Disconnected`) and `Shutdown` travel
//!   out of band: the latest link state is latched in an atomic and can
//!   never be lost to a full queue.
//! - A `Signal` wakes the loop for either kind of event.
//!
//! ```text
//! ┌────────────────┐  Message    ┌──────────────┐
//! │ MQTT callback  │────────────▶│ runtime loop │
//! │ (client task)  │  depth 8    │ (node core)  │
//! │                │────────────▶│              │
//! └────────────────┘  link latch └──────────────┘
//! ```
//!
//! Receive order: pending link change, then queued messages, then
//! shutdown once the queue is empty.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;
use log::warn;

use super::topics::Topic;

/// Channel depth for inbound messages.
pub const INBOX_DEPTH: usize = 8;

/// Largest inbound payload kept. Every command word is far shorter.
pub const MAX_INBOUND_PAYLOAD: usize = 64;

const LINK_UNCHANGED: u8 = 0;
const LINK_UP: u8 = 1;
const LINK_DOWN: u8 = 2;

/// What the transport reports to the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    Message {
        topic: Topic,
        payload: Vec<u8, MAX_INBOUND_PAYLOAD>,
    },
    /// Stop the runtime loop.
    Shutdown,
}

/// Inbox shared between the transport callback and the runtime.
pub struct Inbox {
    messages: Channel<CriticalSectionRawMutex, LinkEvent, INBOX_DEPTH>,
    /// Latest link change not yet seen by the loop.
    link: AtomicU8,
    shutdown: AtomicBool,
    wake: Signal<CriticalSectionRawMutex, ()>,
    dropped: AtomicU32,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Inbox {
    pub const fn new() -> Self {
        Self {
            messages: Channel::new(),
            link: AtomicU8::new(LINK_UNCHANGED),
            shutdown: AtomicBool::new(false),
            wake: Signal::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Hand an event to the loop without blocking. Returns `false` only
    /// for a message dropped on a full queue; link changes and shutdown
    /// always get through.
    pub fn deliver(&self, event: LinkEvent) -> bool {
        match event {
            LinkEvent::Connected => self.link.store(LINK_UP, Ordering::Release),
            LinkEvent::Disconnected => self.link.store(LINK_DOWN, Ordering::Release),
            LinkEvent::Shutdown => self.shutdown.store(true, Ordering::Release),
            message @ LinkEvent::Message { .. } => {
                if self.messages.try_send(message).is_err() {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!("inbox full, dropping message");
                    return false;
                }
            }
        }
        self.wake.signal(());
        true
    }

    /// Queue an inbound message. Oversized topics or payloads cannot be a
    /// command for this node and are dropped.
    pub fn deliver_message(&self, topic: &str, payload: &[u8]) -> bool {
        let Ok(topic) = Topic::try_from(topic) else {
            warn!("inbound topic too long ({} B), dropped", topic.len());
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        let Ok(payload) = Vec::from_slice(payload) else {
            warn!("inbound payload on {} too large ({} B), dropped", topic, payload.len());
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        self.deliver(LinkEvent::Message { topic, payload })
    }

    fn take_link(&self) -> Option<LinkEvent> {
        match self.link.swap(LINK_UNCHANGED, Ordering::AcqRel) {
            LINK_UP => Some(LinkEvent::Connected),
            LINK_DOWN => Some(LinkEvent::Disconnected),
            _ => None,
        }
    }

    /// Next event if one is ready.
    pub fn try_receive(&self) -> Option<LinkEvent> {
        self.take_link()
            .or_else(|| self.messages.try_receive().ok())
            .or_else(|| {
                self.shutdown
                    .swap(false, Ordering::AcqRel)
                    .then_some(LinkEvent::Shutdown)
            })
    }

    /// Wait for the next event.
    pub async fn receive(&self) -> LinkEvent {
        loop {
            if let Some(event) = self.try_receive() {
                return event;
            }
            self.wake.wait().await;
        }
    }

    /// Messages lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

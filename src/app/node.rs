//! The contract between a node core and the runtime loop.
//!
//! ```text
//!   Inbox ──▶ runtime ──▶ on_connected / on_disconnected / on_message
//!                 │
//!   Timer ──▶     └─────▶ poll ──▶ ms until next deadline
//! ```
//!
//! The runtime guarantees that these methods are never called
//! concurrently, and that every queued link event has been dispatched
//! before `poll` runs.

use log::{debug, error, warn};

use crate::diagnostics::NodeDiagnostics;
use crate::mqtt::codec::CodecError;

use super::ports::TransportPort;

/// A node core driven by [`run_node`](crate::runtime::run_node).
pub trait NodeCore {
    /// The broker session came up: subscribe and announce.
    fn on_connected(&mut self, tx: &mut impl TransportPort, now_ms: u64);

    /// The broker session went away. Publishes are held until the next connect.
    fn on_disconnected(&mut self);

    /// An inbound message arrived on a subscribed topic.
    fn on_message(&mut self, topic: &str, payload: &[u8], tx: &mut impl TransportPort, now_ms: u64);

    /// Run whatever timer work is due and return the milliseconds until
    /// the next deadline.
    fn poll(&mut self, tx: &mut impl TransportPort, now_ms: u64) -> u64;

    fn diagnostics(&self) -> &NodeDiagnostics;

    fn diagnostics_mut(&mut self) -> &mut NodeDiagnostics;
}

/// Publish an encoded payload and account for the outcome.
///
/// Returns `true` only if the transport accepted the message.
pub(crate) fn publish_encoded(
    tx: &mut impl TransportPort,
    diag: &mut NodeDiagnostics,
    topic: &str,
    payload: Result<Vec<u8>, CodecError>,
    retain: bool,
) -> bool {
    let bytes = match payload {
        Ok(b) => b,
        Err(e) => {
            error!("{}: {}", topic, e);
            diag.record_publish(false);
            return false;
        }
    };
    match tx.publish(topic, &bytes, retain) {
        Ok(()) => {
            debug!("published {} ({} B)", topic, bytes.len());
            diag.record_publish(true);
            true
        }
        Err(e) => {
            warn!("publish to {} failed: {}", topic, e);
            diag.record_publish(false);
            false
        }
    }
}

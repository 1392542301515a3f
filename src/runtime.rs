//! Node runtime: the single cooperative event loop.
//!
//! Uses `async-io-mini` reactor timers (no busy-spinning) and the
//! `embassy-sync` [`Inbox`] to serialize everything the node core does:
//!
//! ```text
//!  ┌─────────────────────────────────────────────────────────┐
//!  │  run_node                                               │
//!  │                                                         │
//!  │   loop {                                                │
//!  │     drain Inbox ──▶ on_connected / on_message / ...     │
//!  │     poll(now)   ──▶ wait = ms to next deadline          │
//!  │     or(Inbox.receive(), Timer::after(wait)).await       │
//!  │   }                                                     │
//!  └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Every queued event is dispatched before `poll` runs, so several `READ`
//! commands that arrive before a sample collapse into one sample and one
//! publish. A pending link change is dispatched ahead of queued messages.

use core::time::Duration;

use futures_lite::future;
use log::{debug, info};

use crate::app::node::NodeCore;
use crate::app::ports::TransportPort;
use crate::mqtt::channels::{Inbox, LinkEvent};

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Upper bound on one sleep, so a missed wake never stalls the loop for long.
pub const MAX_IDLE_MS: u64 = 60_000;

/// Outcome of one dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

fn dispatch<N: NodeCore, T: TransportPort>(
    node: &mut N,
    tx: &mut T,
    event: LinkEvent,
    now_ms: u64,
) -> Flow {
    match event {
        LinkEvent::Connected => node.on_connected(tx, now_ms),
        LinkEvent::Disconnected => node.on_disconnected(),
        LinkEvent::Message { topic, payload } => node.on_message(&topic, &payload, tx, now_ms),
        LinkEvent::Shutdown => return Flow::Stop,
    }
    Flow::Continue
}

/// Dispatch everything already queued. Returns [`Flow::Stop`] on shutdown.
fn drain<N: NodeCore, T: TransportPort>(
    node: &mut N,
    tx: &mut T,
    inbox: &Inbox,
    clock: &impl Clock,
) -> Flow {
    while let Some(event) = inbox.try_receive() {
        if dispatch(node, tx, event, clock.now_ms()) == Flow::Stop {
            return Flow::Stop;
        }
    }
    Flow::Continue
}

/// Drive `node` until a [`LinkEvent::Shutdown`] arrives.
pub async fn run_node<N: NodeCore, T: TransportPort>(
    node: &mut N,
    tx: &mut T,
    inbox: &Inbox,
    clock: &impl Clock,
) {
    info!("node loop started");
    loop {
        if drain(node, tx, inbox, clock) == Flow::Stop {
            break;
        }
        node.diagnostics_mut().set_dropped_events(inbox.dropped());

        let wait_ms = node.poll(tx, clock.now_ms()).min(MAX_IDLE_MS);
        debug!("idle for up to {} ms", wait_ms);

        let woke = future::or(async { Some(inbox.receive().await) }, async {
            async_io_mini::Timer::after(Duration::from_millis(wait_ms)).await;
            None
        })
        .await;

        if let Some(event) = woke {
            if dispatch(node, tx, event, clock.now_ms()) == Flow::Stop {
                break;
            }
        }
    }
    info!("node loop stopped, {:?}", node.diagnostics());
}

/// Blocking entry point: run the loop on the current thread.
///
/// `futures_lite::future::block_on` parks the thread between wakes while
/// the `async-io-mini` reactor fires the idle timer; the local executor
/// drives the node future itself.
pub fn block_on_node<N: NodeCore, T: TransportPort>(
    node: &mut N,
    tx: &mut T,
    inbox: &Inbox,
    clock: &impl Clock,
) {
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    future::block_on(executor.run(run_node(node, tx, inbox, clock)));
}

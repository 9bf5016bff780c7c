//! Stop signal shared by the signal handler and the accept loop.
//!
//! [`Dispatcher::run`](crate::dispatch::Dispatcher::run) holds the only
//! long-lived receiver. When the signal fires it stops accepting clients and
//! drains the session tracker. Forwarding sessions never see the signal.

use tokio::sync::broadcast;

/// Handle for stopping the dispatcher. Every clone fires the same signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver to hand to an accept loop. A trigger that fires before
    /// anyone subscribes is lost.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscribed accept loop to stop. Returns how many were
    /// listening.
    pub fn trigger(&self) -> usize {
        match self.tx.send(()) {
            Ok(listening) => listening,
            Err(_) => {
                tracing::debug!("Shutdown triggered with no dispatcher running");
                0
            }
        }
    }

    /// Accept loops still subscribed. Drops to zero once every
    /// `Dispatcher::run` has returned and released its receiver.
    pub fn listening(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

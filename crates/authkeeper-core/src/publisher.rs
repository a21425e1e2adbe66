//! Broadcast of the `{user, loading, error}` snapshot.
//!
//! Backed by a `watch` channel: every receiver reads the same latest value,
//! and a receiver that falls behind skips straight to it.

use tokio::sync::watch;

use crate::models::AuthSnapshot;

pub struct StatePublisher {
    tx: watch::Sender<AuthSnapshot>,
}

impl StatePublisher {
    pub fn new(initial: AuthSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> AuthSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Compute and publish the next snapshot while holding the channel's
    /// write lock, so concurrent publishers cannot interleave stale values.
    /// Observers are only notified when the snapshot actually changed.
    pub fn update(&self, next: impl FnOnce() -> AuthSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            let next = next();
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new(AuthSnapshot::default())
    }
}

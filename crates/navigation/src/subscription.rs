//! Subscription handles and the event queue between providers and consumers.
//!
//! Providers never call back into the tracker or compass directly. Each
//! subscription gets a [`Sink`] that pushes tagged events into an
//! [`Inbox`] owned by the consumer, which drains it on its own schedule.
//! Cancelling a [`Subscription`] closes its sink, and anything already
//! queued under a stale id is dropped at dispatch time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Identifies one subscription for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric id
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Consumer-side handle for a live subscription.
#[derive(Debug)]
pub(crate) struct Subscription {
    id: SubscriptionId,
    cancelled: Arc<AtomicBool>,
}

impl Subscription {
    pub(crate) fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Closes the matching sink. Idempotent.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// Provider-side handle used to deliver events for one subscription.
pub struct Sink<T> {
    id: SubscriptionId,
    cancelled: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<Envelope<T>>,
}

// Manual impl: `T` itself need not be `Clone`.
impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            cancelled: Arc::clone(&self.cancelled),
            tx: self.tx.clone(),
        }
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl<T> Sink<T> {
    /// The subscription this sink belongs to.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// True once the consumer has cancelled the subscription.
    ///
    /// Providers may poll this to stop sampling early.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Queues an event. Returns false if the subscription was cancelled or
    /// the consumer is gone.
    pub fn send(&self, event: T) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.tx.send(Envelope { id: self.id, event }).is_ok()
    }
}

/// An event tagged with the subscription that produced it.
#[derive(Debug)]
pub(crate) struct Envelope<T> {
    pub(crate) id: SubscriptionId,
    pub(crate) event: T,
}

/// Consumer-side queue shared by every subscription a consumer opens.
pub(crate) struct Inbox<T> {
    tx: mpsc::UnboundedSender<Envelope<T>>,
    rx: mpsc::UnboundedReceiver<Envelope<T>>,
    next_id: u64,
}

impl<T> Inbox<T> {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx, next_id: 1 }
    }

    /// Allocates a fresh id and returns the consumer and provider halves.
    pub(crate) fn open(&mut self) -> (Subscription, Sink<T>) {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let cancelled = Arc::new(AtomicBool::new(false));
        let subscription = Subscription { id, cancelled: Arc::clone(&cancelled) };
        let sink = Sink { id, cancelled, tx: self.tx.clone() };
        (subscription, sink)
    }

    /// Next queued event, without waiting.
    pub(crate) fn try_next(&mut self) -> Option<Envelope<T>> {
        match self.rx.try_recv() {
            Ok(envelope) => Some(envelope),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Waits for the next event.
    ///
    /// The inbox keeps a sender of its own, so this only resolves when an
    /// event arrives.
    pub(crate) async fn next(&mut self) -> Option<Envelope<T>> {
        self.rx.recv().await
    }
}

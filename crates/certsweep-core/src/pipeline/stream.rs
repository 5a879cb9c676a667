//! Cancellation-aware stream plumbing shared by every stage
//!
//! Each suspension point races the channel operation against the shared
//! cancellation token, so a worker blocked on a full or empty stream unwinds
//! as soon as the token fires.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Buffer depth of every stage-to-stage stream. Keeps hand-offs close to
/// rendezvous so backpressure reaches the producers.
pub const STAGE_CAPACITY: usize = 1;

/// Send `item`, giving up if cancellation fires first.
///
/// Returns `false` when the item was not delivered (cancelled or the receiver
/// is gone); the caller should stop producing.
pub async fn send_or_cancel<T>(
    tx: &mpsc::Sender<T>,
    item: T,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}

/// Receive the next item, or `None` once the stream closes or cancellation fires.
pub async fn recv_or_cancel<T>(
    rx: &mut mpsc::Receiver<T>,
    cancel: &CancellationToken,
) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        item = rx.recv() => item,
    }
}

/// A receiver several workers pull from, each item going to exactly one.
pub struct SharedReceiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedReceiver<T> {
    pub fn new(rx: mpsc::Receiver<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rx)),
        }
    }

    /// Pull the next item, or `None` once the stream closes or cancellation fires.
    pub async fn recv(&self, cancel: &CancellationToken) -> Option<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            item = async { self.inner.lock().await.recv().await } => item,
        }
    }
}

// Fan-out plumbing behind `SpeechControl::on`.
//
// All term subscribers of a controller share one listening session. The
// session is reference counted: the first subscriber starts it, the last one
// to drop stops it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::recognition::matcher;

use super::ListenItem;

pub(crate) struct SharedListening {
    /// Distinguishes this shared session from later ones in the same slot.
    pub(crate) epoch: u64,
    pub(crate) events: broadcast::Sender<ListenItem>,
    pub(crate) subscribers: Arc<AtomicUsize>,
    pub(crate) stop: CancellationToken,
}

pub(crate) type SharedSlot = Arc<Mutex<Option<SharedListening>>>;

/// Subscription ticket held by each `CommandStream`.
pub(crate) struct SubscriberGuard {
    slot: SharedSlot,
    epoch: u64,
    subscribers: Arc<AtomicUsize>,
    stop: CancellationToken,
}

impl SubscriberGuard {
    /// Registers one subscriber. The caller must hold the slot lock so that
    /// registration and teardown are ordered against each other.
    pub(crate) fn register(slot: &SharedSlot, shared: &SharedListening) -> Self {
        shared.subscribers.fetch_add(1, Ordering::SeqCst);
        Self {
            slot: Arc::clone(slot),
            epoch: shared.epoch,
            subscribers: Arc::clone(&shared.subscribers),
            stop: shared.stop.clone(),
        }
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if self.subscribers.fetch_sub(1, Ordering::SeqCst) == 1 {
            debug!("Last command subscriber detached; stopping shared listening");
            // A newer shared session may already occupy the slot.
            if slot
                .as_ref()
                .is_some_and(|shared| shared.epoch == self.epoch)
            {
                *slot = None;
            }
            self.stop.cancel();
        }
    }
}

/// Forwards matching events from the shared broadcast into one subscriber's
/// channel. An error item is terminal for the subscriber too.
pub(crate) fn spawn_term_filter(
    mut events: broadcast::Receiver<ListenItem>,
    term: String,
    tx: mpsc::Sender<ListenItem>,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(Ok(event)) => {
                        if matcher::matches(&event, &term) {
                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Err(err)) => {
                        let _ = tx.send(Err(err)).await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            "Command subscriber for {:?} lagged; skipped {} events",
                            term, skipped
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = tx.closed() => break,
            }
        }
    });
}

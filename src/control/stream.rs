use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SpeechControlError;
use crate::recognition::RecognitionEvent;

use super::shared::SubscriberGuard;
use super::ListenItem;

/// Recognition events from one listening session.
///
/// Yields debounced result batches. A failure arrives as a single `Err` item,
/// after which the stream completes; stopping the session completes the
/// stream without an error. Dropping the stream stops the session.
pub struct EventStream {
    rx: mpsc::Receiver<ListenItem>,
    stop: CancellationToken,
}

impl EventStream {
    pub(crate) fn new(rx: mpsc::Receiver<ListenItem>, stop: CancellationToken) -> Self {
        Self { rx, stop }
    }
}

impl Stream for EventStream {
    type Item = Result<RecognitionEvent, SpeechControlError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Events whose newest transcript contains a subscribed term.
///
/// All command streams of one controller share a single listening session.
/// Dropping the last one stops that session.
pub struct CommandStream {
    rx: mpsc::Receiver<ListenItem>,
    _guard: SubscriberGuard,
}

impl CommandStream {
    pub(crate) fn new(rx: mpsc::Receiver<ListenItem>, guard: SubscriberGuard) -> Self {
        Self { rx, _guard: guard }
    }
}

impl Stream for CommandStream {
    type Item = Result<RecognitionEvent, SpeechControlError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

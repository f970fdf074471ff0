use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ListenConfig;
use crate::notification::NotificationConfig;
use crate::platform::Platform;
use crate::store;

use super::driver::ListenDriver;
use super::shared::{spawn_term_filter, SharedListening, SharedSlot, SubscriberGuard};
use super::stream::{CommandStream, EventStream};
use super::ListenItem;

/// Capacity of each per-stream event channel.
const EVENT_CHANNEL_SIZE: usize = 32;
/// Capacity of the broadcast channel behind command subscribers.
const SHARED_CHANNEL_SIZE: usize = 64;

pub(crate) struct ActiveSession {
    pub(crate) generation: u64,
    pub(crate) stop: CancellationToken,
    /// Cancelled once the session's driver has released recognition.
    pub(crate) done: CancellationToken,
}

/// Slot holding the controller's one active session. A newer session takes
/// the slot over and revokes the previous occupant.
pub(crate) type ActiveSlot = Arc<Mutex<Option<ActiveSession>>>;

/// Always-listening voice command control.
///
/// At most one physical recognition session runs per controller. `start`
/// returns the raw event stream; `on` returns a filtered stream and shares
/// one session among all subscribers. The listening notification lets the
/// user disable speech control for good.
pub struct SpeechControl {
    platform: Platform,
    config: ListenConfig,
    notification: Mutex<NotificationConfig>,
    active: ActiveSlot,
    shared: SharedSlot,
    /// Cancelled once the user dismisses the notification.
    disable: CancellationToken,
    generations: AtomicU64,
    epochs: AtomicU64,
}

impl SpeechControl {
    pub fn new(platform: Platform, config: ListenConfig) -> Self {
        Self {
            platform,
            config,
            notification: Mutex::new(NotificationConfig::default()),
            active: Arc::new(Mutex::new(None)),
            shared: Arc::new(Mutex::new(None)),
            disable: CancellationToken::new(),
            generations: AtomicU64::new(0),
            epochs: AtomicU64::new(0),
        }
    }

    /// Whether listening can be started: the platform has a recognition
    /// engine and the user has not disabled speech control.
    pub fn is_enabled(&self) -> bool {
        self.platform.recognition.is_supported() && !self.is_disabled()
    }

    fn is_disabled(&self) -> bool {
        self.disable.is_cancelled() || store::disabled_flag_set(self.platform.flags.as_ref())
    }

    /// Replaces the notification settings used by sessions started later.
    pub fn set_notification(&self, notification: NotificationConfig) {
        *self.notification.lock() = notification;
    }

    /// Starts a listening session and returns its event stream.
    ///
    /// Any previously started session is revoked; its stream completes
    /// without an error item. When listening cannot start at all the stream
    /// yields a single `Err` and completes.
    pub fn start(&self) -> EventStream {
        let (stream, _stop) = self.start_session(None);
        stream
    }

    /// Like `start`, with notification settings for this session only.
    pub fn start_with_notification(&self, notification: NotificationConfig) -> EventStream {
        let (stream, _stop) = self.start_session(Some(notification));
        stream
    }

    /// Events whose newest transcript contains `term`.
    ///
    /// Subscribers share one listening session: the first live subscriber
    /// starts it, the last one to drop stops it. A subscriber arriving while
    /// the previous shared session is winding down gets a fresh session.
    pub fn on(&self, term: &str) -> CommandStream {
        let mut slot = self.shared.lock();
        let (guard, events) = match slot.as_ref() {
            Some(listening) if !listening.stop.is_cancelled() => (
                SubscriberGuard::register(&self.shared, listening),
                listening.events.subscribe(),
            ),
            // A stopping session stays in the slot until its fan-out task
            // drains; it is not reusable.
            _ => {
                let (listening, events) = self.start_shared();
                let guard = SubscriberGuard::register(&self.shared, &listening);
                *slot = Some(listening);
                (guard, events)
            }
        };
        drop(slot);

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        spawn_term_filter(events, term.to_string(), tx);
        debug!("Command subscription added for term {:?}", term);
        CommandStream::new(rx, guard)
    }

    /// Stops the active listening session, if any, and hides the
    /// notification. In-flight streams complete without an error item.
    pub fn stop(&self) {
        let active = self.active.lock();
        match active.as_ref() {
            Some(session) => {
                info!("Stopping listening session generation {}", session.generation);
                session.stop.cancel();
            }
            None => debug!("Stop requested with no active listening session"),
        }
        drop(active);

        self.platform.notifier.remove();
    }

    fn start_session(
        &self,
        notification: Option<NotificationConfig>,
    ) -> (EventStream, CancellationToken) {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let stop = CancellationToken::new();
        let done = CancellationToken::new();
        let predecessor = {
            let mut active = self.active.lock();
            let predecessor = active.take().map(|previous| {
                debug!(
                    "Listening session generation {} superseded by {}",
                    previous.generation, generation
                );
                previous.stop.cancel();
                previous.done
            });
            *active = Some(ActiveSession {
                generation,
                stop: stop.clone(),
                done: done.clone(),
            });
            predecessor
        };

        let notification = notification.unwrap_or_else(|| self.notification.lock().clone());
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let driver = ListenDriver {
            session_id: format!("listen-{}", Uuid::new_v4()),
            generation,
            config: self.config.clone(),
            platform: self.platform.clone(),
            notification,
            stop: stop.clone(),
            disable: self.disable.clone(),
            active: Arc::clone(&self.active),
            tx,
            notification_shown: false,
            done,
            predecessor,
        };
        tokio::spawn(driver.run());

        (EventStream::new(rx, stop.clone()), stop)
    }

    /// Starts the session backing command subscribers and the task fanning
    /// its events out. Returns the broadcast receiver created before the
    /// fan-out task runs, so the first subscriber cannot miss an early error.
    fn start_shared(&self) -> (SharedListening, broadcast::Receiver<ListenItem>) {
        let epoch = self.epochs.fetch_add(1, Ordering::SeqCst) + 1;
        let (events, receiver) = broadcast::channel(SHARED_CHANNEL_SIZE);
        let (stream, stop) = self.start_session(None);
        info!("Shared listening session starting (epoch {})", epoch);

        let slot = Arc::clone(&self.shared);
        let fan_out = events.clone();
        tokio::spawn(async move {
            let mut stream = stream;
            while let Some(item) = stream.next().await {
                // Send fails only while no subscriber exists at this instant.
                let _ = fan_out.send(item);
            }
            let mut slot = slot.lock();
            if slot.as_ref().is_some_and(|shared| shared.epoch == epoch) {
                debug!("Shared listening session ended (epoch {})", epoch);
                *slot = None;
            }
        });

        (
            SharedListening {
                epoch,
                events,
                subscribers: Arc::new(AtomicUsize::new(0)),
                stop,
            },
            receiver,
        )
    }
}

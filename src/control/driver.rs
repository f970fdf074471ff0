// One driver task per logical listening session.
//
// The driver gates on microphone permission, then loops physical recognition
// sessions: benign ends and transient silence restart capture after a delay,
// anything else ends the stream with a single error item.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ListenConfig;
use crate::error::SpeechControlError;
use crate::notification::NotificationConfig;
use crate::permission::PermissionGate;
use crate::platform::Platform;
use crate::recognition::{RecognitionConfig, RecognitionEvent, SessionEvent};
use crate::store;

use super::controller::ActiveSlot;
use super::ListenItem;

/// Debounce timer deadline while no result is pending.
const DEBOUNCE_PARKED: Duration = Duration::from_secs(24 * 60 * 60);

enum Cycle {
    /// The physical session ended benignly; start another after the delay.
    Restart,
    /// The logical session is over with nothing to report.
    Finished,
}

pub(crate) struct ListenDriver {
    pub(crate) session_id: String,
    pub(crate) generation: u64,
    pub(crate) config: ListenConfig,
    pub(crate) platform: Platform,
    pub(crate) notification: NotificationConfig,
    /// Cancelled when this logical session is stopped or superseded.
    pub(crate) stop: CancellationToken,
    /// Cancelled when the user disables speech control; shared by all
    /// sessions of the controller.
    pub(crate) disable: CancellationToken,
    pub(crate) active: ActiveSlot,
    pub(crate) tx: mpsc::Sender<ListenItem>,
    pub(crate) notification_shown: bool,
    /// Cancelled by this driver once it has released recognition.
    pub(crate) done: CancellationToken,
    /// `done` of the session this one superseded, if any.
    pub(crate) predecessor: Option<CancellationToken>,
}

impl ListenDriver {
    pub(crate) async fn run(mut self) {
        info!("Listening session {} starting", self.session_id);
        match self.listen().await {
            Ok(()) => info!("Listening session {} finished", self.session_id),
            Err(err) => {
                error!("Listening session {} failed: {}", self.session_id, err);
                let _ = self.tx.send(Err(err)).await;
            }
        }
        self.finish();
        // A finished session leaves its stop token cancelled.
        self.stop.cancel();
        // `done` must not fire before older sessions have released
        // recognition too.
        if let Some(previous) = self.predecessor.take() {
            previous.cancelled().await;
        }
        self.done.cancel();
    }

    async fn listen(&mut self) -> Result<(), SpeechControlError> {
        if !self.platform.recognition.is_supported() {
            return Err(SpeechControlError::NoSpeechRecognition);
        }
        if self.is_disabled() {
            return Err(SpeechControlError::Disabled);
        }

        let gate = PermissionGate::new(
            self.platform.permissions.clone(),
            self.platform.media.clone(),
        );
        debug!(
            "Listening session {} waiting for microphone permission",
            self.session_id
        );
        tokio::select! {
            granted = gate.when_granted() => granted?,
            _ = self.stop.cancelled() => return Ok(()),
            _ = self.disable.cancelled() => return Err(SpeechControlError::Disabled),
            _ = self.tx.closed() => return Ok(()),
        }
        // The session may have been stopped while the grant arrived.
        if self.stop.is_cancelled() {
            return Ok(());
        }
        // At most one physical session runs at a time; the superseded driver
        // may still be mid-capture.
        if let Some(previous) = &self.predecessor {
            if !previous.is_cancelled() {
                debug!(
                    "Listening session {} waiting for its predecessor to stop",
                    self.session_id
                );
                tokio::select! {
                    _ = previous.cancelled() => {}
                    _ = self.stop.cancelled() => return Ok(()),
                    _ = self.disable.cancelled() => return Err(SpeechControlError::Disabled),
                    _ = self.tx.closed() => return Ok(()),
                }
            }
        }

        loop {
            if !self.owns_session() {
                debug!("Listening session {} superseded; winding down", self.session_id);
                return Ok(());
            }
            self.show_notification().await;
            match self.capture().await? {
                Cycle::Finished => return Ok(()),
                Cycle::Restart => {}
            }
            tokio::select! {
                _ = time::sleep(self.config.restart_delay()) => {}
                _ = self.stop.cancelled() => return Ok(()),
                _ = self.disable.cancelled() => return Err(SpeechControlError::Disabled),
                _ = self.tx.closed() => return Ok(()),
            }
        }
    }

    /// Runs one physical recognition session to completion.
    async fn capture(&mut self) -> Result<Cycle, SpeechControlError> {
        let recognition_config = RecognitionConfig {
            language: Some(self.config.language().to_string()),
            continuous: self.config.continuous,
        };
        let mut session = self
            .platform
            .recognition
            .create(&recognition_config)
            .map_err(|err| {
                SpeechControlError::Backend(format!("failed to create recognition session: {err:#}"))
            })?;
        let mut events = session.start().await.map_err(|err| {
            SpeechControlError::Backend(format!("failed to start recognition session: {err:#}"))
        })?;
        debug!(
            "Recognition session started on {} ({})",
            self.platform.recognition.name(),
            self.session_id
        );

        let mut pending: Option<RecognitionEvent> = None;
        let debounce = time::sleep(DEBOUNCE_PARKED);
        tokio::pin!(debounce);

        let cycle = loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(SessionEvent::Result(result)) => {
                        debug!("Recognition result received ({})", self.session_id);
                        // A newer result replaces the pending one.
                        pending = Some(result);
                        debounce.as_mut().reset(Instant::now() + self.config.debounce());
                    }
                    Some(SessionEvent::Error(err)) if err.is_no_speech() => {
                        if !self.flush(&mut pending).await {
                            break Cycle::Finished;
                        }
                        info!(
                            "No speech detected; retrying in {:?} ({})",
                            self.config.restart_delay(),
                            self.session_id
                        );
                        break Cycle::Restart;
                    }
                    Some(SessionEvent::Error(err)) => {
                        let _ = self.flush(&mut pending).await;
                        session.stop().await;
                        return Err(SpeechControlError::Recognition(err));
                    }
                    Some(SessionEvent::Ended) | None => {
                        if !self.flush(&mut pending).await {
                            break Cycle::Finished;
                        }
                        debug!(
                            "Recognition session ended; restarting in {:?} ({})",
                            self.config.restart_delay(),
                            self.session_id
                        );
                        break Cycle::Restart;
                    }
                },
                () = &mut debounce, if pending.is_some() => {
                    if !self.flush(&mut pending).await {
                        break Cycle::Finished;
                    }
                }
                _ = self.stop.cancelled() => break Cycle::Finished,
                _ = self.disable.cancelled() => {
                    session.stop().await;
                    return Err(SpeechControlError::Disabled);
                }
                _ = self.tx.closed() => {
                    debug!("All listeners dropped; stopping session {}", self.session_id);
                    break Cycle::Finished;
                }
            }
        };

        session.stop().await;
        Ok(cycle)
    }

    /// Sends the pending result downstream, never reordering it past the
    /// event that triggered the flush. Returns false when every consumer is
    /// gone.
    async fn flush(&self, pending: &mut Option<RecognitionEvent>) -> bool {
        if let Some(event) = pending.take() {
            if self.tx.send(Ok(event)).await.is_err() {
                return false;
            }
        }
        true
    }

    /// Shows the listening notification once per logical session.
    async fn show_notification(&mut self) {
        if self.notification_shown {
            return;
        }
        self.notification_shown = true;

        let request = self.notification.clone().resolved(self.config.language());
        match self.platform.notifier.append(request).await {
            Ok(handle) => {
                let flags = self.platform.flags.clone();
                let disable = self.disable.clone();
                tokio::spawn(async move {
                    if handle.dismissed.await.is_ok() {
                        info!("Listening notification dismissed; disabling speech control");
                        flags.set(store::DISABLED_FLAG_KEY, "true");
                        disable.cancel();
                    }
                });

                let notifier = self.platform.notifier.clone();
                let auto_hide = self.config.notification_auto_hide();
                tokio::spawn(async move {
                    time::sleep(auto_hide).await;
                    notifier.remove();
                });
            }
            Err(err) => warn!("Failed to show listening notification: {err:#}"),
        }
    }

    fn is_disabled(&self) -> bool {
        self.disable.is_cancelled() || store::disabled_flag_set(self.platform.flags.as_ref())
    }

    fn owns_session(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|session| session.generation == self.generation)
    }

    /// Releases the active-session slot and hides the notification, unless a
    /// newer session already took the slot over.
    fn finish(&self) {
        let mut active = self.active.lock();
        let owner = active
            .as_ref()
            .is_some_and(|session| session.generation == self.generation);
        if owner {
            *active = None;
        }
        drop(active);

        if owner && self.notification_shown {
            self.platform.notifier.remove();
        }
    }
}

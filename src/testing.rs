//! Scriptable platform doubles for tests and demos.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::RecognitionError;
use crate::notification::{NotificationConfig, NotificationHandle, Notifier};
use crate::permission::{
    MediaAccess, MediaTrack, MicrophonePermissions, PermissionState, PermissionStatus,
};
use crate::platform::Platform;
use crate::recognition::{
    RecognitionConfig, RecognitionEvent, RecognitionProvider, RecognitionSession, SessionEvent,
};
use crate::store::MemoryFlagStore;

/// One step in a scripted recognition session.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Report a result event.
    Emit(RecognitionEvent),
    /// Pause before the next step.
    Wait(Duration),
    /// Fail the session with an error code.
    Fail(RecognitionError),
    /// End the session without an error.
    End,
}

impl ScriptStep {
    /// Report a single-transcript result.
    pub fn say(transcript: &str) -> Self {
        Self::Emit(RecognitionEvent::from_transcript(transcript))
    }

    pub fn wait_ms(ms: u64) -> Self {
        Self::Wait(Duration::from_millis(ms))
    }
}

/// Recognition provider that plays back scripts, one per created session.
///
/// A session with no script left stays silent until it is stopped.
pub struct ScriptedRecognition {
    supported: bool,
    scripts: Mutex<VecDeque<Vec<ScriptStep>>>,
    sessions_started: Arc<AtomicUsize>,
    sessions_stopped: Arc<AtomicUsize>,
    lifecycle: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptedRecognition {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            scripts: Mutex::new(VecDeque::new()),
            sessions_started: Arc::new(AtomicUsize::new(0)),
            sessions_stopped: Arc::new(AtomicUsize::new(0)),
            lifecycle: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// A provider reporting no recognition support at all.
    pub fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            scripts: Mutex::new(VecDeque::new()),
            sessions_started: Arc::new(AtomicUsize::new(0)),
            sessions_stopped: Arc::new(AtomicUsize::new(0)),
            lifecycle: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn with_scripts(scripts: Vec<Vec<ScriptStep>>) -> Arc<Self> {
        let provider = Self::new();
        for script in scripts {
            provider.push_script(script);
        }
        provider
    }

    /// Queues the script for the next created session.
    pub fn push_script(&self, script: Vec<ScriptStep>) {
        self.scripts.lock().push_back(script);
    }

    pub fn sessions_started(&self) -> usize {
        self.sessions_started.load(Ordering::SeqCst)
    }

    pub fn sessions_stopped(&self) -> usize {
        self.sessions_stopped.load(Ordering::SeqCst)
    }

    /// `"started"`/`"stopped"` entries across all sessions, oldest first.
    pub fn lifecycle(&self) -> Vec<&'static str> {
        self.lifecycle.lock().clone()
    }
}

impl RecognitionProvider for ScriptedRecognition {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, _config: &RecognitionConfig) -> Result<Box<dyn RecognitionSession>> {
        let script = self.scripts.lock().pop_front().unwrap_or_default();
        Ok(Box::new(ScriptedSession {
            script: Some(script),
            started: Arc::clone(&self.sessions_started),
            stopped: Arc::clone(&self.sessions_stopped),
            lifecycle: Arc::clone(&self.lifecycle),
            cancel: CancellationToken::new(),
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedSession {
    script: Option<Vec<ScriptStep>>,
    started: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
    lifecycle: Arc<Mutex<Vec<&'static str>>>,
    cancel: CancellationToken,
}

#[async_trait::async_trait]
impl RecognitionSession for ScriptedSession {
    async fn start(&mut self) -> Result<mpsc::Receiver<SessionEvent>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.lifecycle.lock().push("started");
        let (tx, rx) = mpsc::channel(16);
        let steps = self.script.take().unwrap_or_default();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            for step in steps {
                match step {
                    ScriptStep::Emit(event) => {
                        if tx.send(SessionEvent::Result(event)).await.is_err() {
                            return;
                        }
                    }
                    ScriptStep::Wait(duration) => {
                        tokio::select! {
                            _ = time::sleep(duration) => {}
                            _ = cancel.cancelled() => return,
                        }
                    }
                    ScriptStep::Fail(err) => {
                        let _ = tx.send(SessionEvent::Error(err)).await;
                        return;
                    }
                    ScriptStep::End => {
                        let _ = tx.send(SessionEvent::Ended).await;
                        return;
                    }
                }
                if cancel.is_cancelled() {
                    return;
                }
            }
            // Script exhausted; hold the session open until stopped.
            cancel.cancelled().await;
        });
        Ok(rx)
    }

    async fn stop(&mut self) {
        if !self.cancel.is_cancelled() {
            self.stopped.fetch_add(1, Ordering::SeqCst);
            self.lifecycle.lock().push("stopped");
            self.cancel.cancel();
        }
    }
}

/// Permission source with a fixed or staged answer.
pub struct StaticPermissions {
    supported: bool,
    initial: PermissionState,
    changes: Mutex<Option<mpsc::Receiver<PermissionState>>>,
}

impl StaticPermissions {
    pub fn granted() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            initial: PermissionState::Granted,
            changes: Mutex::new(None),
        })
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            initial: PermissionState::Denied,
            changes: Mutex::new(None),
        })
    }

    /// No permission API; the gate falls back to a media probe.
    pub fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            initial: PermissionState::Prompt,
            changes: Mutex::new(None),
        })
    }

    /// Starts at `Prompt`; push later states through the returned sender.
    pub fn prompt() -> (Arc<Self>, mpsc::Sender<PermissionState>) {
        let (tx, rx) = mpsc::channel(4);
        (
            Arc::new(Self {
                supported: true,
                initial: PermissionState::Prompt,
                changes: Mutex::new(Some(rx)),
            }),
            tx,
        )
    }
}

#[async_trait::async_trait]
impl MicrophonePermissions for StaticPermissions {
    async fn query(&self) -> Result<Option<PermissionStatus>> {
        if !self.supported {
            return Ok(None);
        }
        // Only the first query gets the staged change channel.
        let changes = self
            .changes
            .lock()
            .take()
            .unwrap_or_else(|| mpsc::channel(1).1);
        Ok(Some(PermissionStatus {
            state: self.initial,
            changes,
        }))
    }
}

/// Media source that grants or refuses audio capture and counts requests.
pub struct ProbeMediaAccess {
    grant: bool,
    requests: AtomicUsize,
    track_stops: Arc<AtomicUsize>,
}

impl ProbeMediaAccess {
    pub fn granting() -> Arc<Self> {
        Arc::new(Self {
            grant: true,
            requests: AtomicUsize::new(0),
            track_stops: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn denying() -> Arc<Self> {
        Arc::new(Self {
            grant: false,
            requests: AtomicUsize::new(0),
            track_stops: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// How many probe tracks were stopped again after being handed out.
    pub fn track_stops(&self) -> usize {
        self.track_stops.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MediaAccess for ProbeMediaAccess {
    async fn request_audio(&self) -> Result<Box<dyn MediaTrack>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.grant {
            bail!("microphone access refused");
        }
        Ok(Box::new(ProbeTrack {
            stops: Arc::clone(&self.track_stops),
        }))
    }
}

struct ProbeTrack {
    stops: Arc<AtomicUsize>,
}

impl MediaTrack for ProbeTrack {
    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Notifier that records calls and lets tests trigger dismissal.
pub struct CountingNotifier {
    appends: AtomicUsize,
    removes: AtomicUsize,
    fail_appends: bool,
    dismiss_tx: Mutex<Option<oneshot::Sender<()>>>,
    last_config: Mutex<Option<NotificationConfig>>,
}

impl CountingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            appends: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            fail_appends: false,
            dismiss_tx: Mutex::new(None),
            last_config: Mutex::new(None),
        })
    }

    /// A notifier whose `append` always fails. Attempts are still counted.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            appends: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            fail_appends: true,
            dismiss_tx: Mutex::new(None),
            last_config: Mutex::new(None),
        })
    }

    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    /// Activates the dismiss action of the most recent notification.
    /// Returns false when no dismissible notification is up.
    pub fn dismiss(&self) -> bool {
        match self.dismiss_tx.lock().take() {
            Some(sender) => sender.send(()).is_ok(),
            None => false,
        }
    }

    pub fn last_config(&self) -> Option<NotificationConfig> {
        self.last_config.lock().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for CountingNotifier {
    async fn append(&self, config: NotificationConfig) -> Result<NotificationHandle> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock() = Some(config);
        if self.fail_appends {
            bail!("notification host unavailable");
        }
        let (tx, rx) = oneshot::channel();
        *self.dismiss_tx.lock() = Some(tx);
        Ok(NotificationHandle { dismissed: rx })
    }

    fn remove(&self) {
        self.removes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A platform wired with the given doubles, permission already granted, and
/// an in-memory flag store.
pub fn scripted_platform(
    recognition: Arc<ScriptedRecognition>,
    notifier: Arc<CountingNotifier>,
) -> Platform {
    Platform::new(
        recognition,
        StaticPermissions::granted(),
        ProbeMediaAccess::granting(),
        notifier,
        Arc::new(MemoryFlagStore::new()),
    )
}

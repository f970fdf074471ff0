//! Microphone permission checks.
//!
//! Recognition never starts until the microphone is usable. Platforms with a
//! permission API report state changes over a channel; everywhere else the
//! gate probes by briefly requesting an audio track.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::SpeechControlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    /// The user has not decided yet; a prompt may be showing.
    Prompt,
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
            PermissionState::Prompt => "prompt",
        };
        write!(f, "{s}")
    }
}

/// Current microphone permission plus a channel of later changes.
pub struct PermissionStatus {
    pub state: PermissionState,
    pub changes: mpsc::Receiver<PermissionState>,
}

/// Platform permission query. `Ok(None)` means the platform cannot report
/// microphone permission at all.
#[async_trait::async_trait]
pub trait MicrophonePermissions: Send + Sync {
    async fn query(&self) -> Result<Option<PermissionStatus>>;
}

/// A live capture handle obtained purely to prove access.
pub trait MediaTrack: Send {
    fn stop(&mut self);
}

/// Requests microphone capture from the platform.
#[async_trait::async_trait]
pub trait MediaAccess: Send + Sync {
    async fn request_audio(&self) -> Result<Box<dyn MediaTrack>>;
}

/// Resolves once microphone access is granted, or fails with
/// [`SpeechControlError::PermissionDenied`].
pub struct PermissionGate {
    permissions: Arc<dyn MicrophonePermissions>,
    media: Arc<dyn MediaAccess>,
}

impl PermissionGate {
    pub fn new(permissions: Arc<dyn MicrophonePermissions>, media: Arc<dyn MediaAccess>) -> Self {
        Self { permissions, media }
    }

    /// Waits for a grant. While the state is `Prompt` this pends on the
    /// change channel, so recognition starts the moment the user accepts.
    pub async fn when_granted(&self) -> Result<(), SpeechControlError> {
        match self.permissions.query().await {
            Ok(Some(status)) => self.await_grant(status).await,
            Ok(None) => {
                debug!("Permission query unsupported; probing with a media request");
                self.probe().await
            }
            Err(err) => {
                warn!("Permission query failed: {err:#}; probing with a media request");
                self.probe().await
            }
        }
    }

    async fn await_grant(&self, mut status: PermissionStatus) -> Result<(), SpeechControlError> {
        let mut state = status.state;
        loop {
            match state {
                PermissionState::Granted => {
                    debug!("Microphone permission granted");
                    return Ok(());
                }
                PermissionState::Denied => {
                    return Err(SpeechControlError::PermissionDenied(
                        "microphone access denied".to_string(),
                    ));
                }
                PermissionState::Prompt => match status.changes.recv().await {
                    Some(next) => {
                        debug!("Microphone permission changed to {next}");
                        state = next;
                    }
                    None => {
                        return Err(SpeechControlError::PermissionDenied(
                            "permission prompt closed without a decision".to_string(),
                        ));
                    }
                },
            }
        }
    }

    /// Requests an audio track and releases it immediately. Success proves
    /// the permission; the track itself is never kept.
    async fn probe(&self) -> Result<(), SpeechControlError> {
        let mut track = self
            .media
            .request_audio()
            .await
            .map_err(|err| SpeechControlError::PermissionDenied(format!("{err:#}")))?;
        track.stop();
        debug!("Microphone permission granted via media probe");
        Ok(())
    }
}

// Recognition backend abstraction.
//
// A provider creates one recognition session per physical capture run. The
// session pushes events over a channel until it ends, errors, or is stopped.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::RecognitionError;

/// One batch of results reported by a recognition session. Results accumulate
/// over the lifetime of the session; the most recent utterance is the last
/// result in the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionEvent {
    pub results: Vec<RecognitionResult>,
}

/// Candidate transcriptions for a single utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionAlternative {
    pub transcript: String,
    pub confidence: f32,
}

impl RecognitionEvent {
    /// Builds an event carrying a single transcript. Convenient for backends
    /// that report one alternative per utterance.
    pub fn from_transcript(transcript: &str) -> Self {
        Self {
            results: vec![RecognitionResult {
                alternatives: vec![RecognitionAlternative {
                    transcript: transcript.to_string(),
                    confidence: 1.0,
                }],
            }],
        }
    }
}

/// Everything a recognition session can report while running.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// New results are available.
    Result(RecognitionEvent),
    /// The session ended on its own without an error.
    Ended,
    /// The session failed with a backend error code.
    Error(RecognitionError),
}

/// Settings applied to each recognition session.
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// BCP 47 language tag, e.g. "en-US". `None` lets the backend pick.
    pub language: Option<String>,
    /// Ask the backend to keep listening across utterances. Backends may
    /// ignore this and end early; callers are expected to restart.
    pub continuous: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: None,
            continuous: true,
        }
    }
}

/// Factory for recognition sessions.
pub trait RecognitionProvider: Send + Sync {
    /// Whether this platform has a usable recognition engine at all.
    fn is_supported(&self) -> bool;

    /// Creates a session ready to be started.
    fn create(&self, config: &RecognitionConfig) -> Result<Box<dyn RecognitionSession>>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// A single physical recognition run.
#[async_trait::async_trait]
pub trait RecognitionSession: Send {
    /// Starts capturing. Events arrive on the returned channel; the channel
    /// closing means the session is over.
    async fn start(&mut self) -> Result<mpsc::Receiver<SessionEvent>>;

    /// Stops capturing. Idempotent; safe to call after the session ended.
    async fn stop(&mut self);
}

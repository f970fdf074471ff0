use thiserror::Error;

/// Terminal failures delivered through listening event streams.
///
/// Streams carry these as `Err` items. A stream yields at most one error and
/// completes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechControlError {
    #[error("speech recognition is not available on this platform")]
    NoSpeechRecognition,

    #[error("speech control is disabled")]
    Disabled,

    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("recognition failed: {0}")]
    Recognition(RecognitionError),

    #[error("recognition backend error: {0}")]
    Backend(String),
}

/// Error codes reported by a recognition session.
///
/// The set mirrors the codes speech backends commonly report. Unknown codes
/// are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("no-speech")]
    NoSpeech,
    #[error("aborted")]
    Aborted,
    #[error("audio-capture")]
    AudioCapture,
    #[error("not-allowed")]
    NotAllowed,
    #[error("service-not-allowed")]
    ServiceNotAllowed,
    #[error("network")]
    Network,
    #[error("{0}")]
    Other(String),
}

impl RecognitionError {
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "audio-capture" => Self::AudioCapture,
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "network" => Self::Network,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::NoSpeech => "no-speech",
            Self::Aborted => "aborted",
            Self::AudioCapture => "audio-capture",
            Self::NotAllowed => "not-allowed",
            Self::ServiceNotAllowed => "service-not-allowed",
            Self::Network => "network",
            Self::Other(code) => code,
        }
    }

    /// Transient silence. Sessions ending with this code are retried rather
    /// than treated as failures.
    pub fn is_no_speech(&self) -> bool {
        matches!(self, Self::NoSpeech)
    }
}

pub mod config;
pub mod control;
pub mod error;
pub mod notification;
pub mod permission;
pub mod platform;
pub mod recognition;
pub mod store;
pub mod testing;

pub use config::ListenConfig;
pub use control::{CommandStream, EventStream, SpeechControl};
pub use error::{RecognitionError, SpeechControlError};
pub use notification::{
    NotificationConfig, NotificationHandle, Notifier, DEFAULT_DISMISS_LABEL,
};
pub use permission::{
    MediaAccess, MediaTrack, MicrophonePermissions, PermissionGate, PermissionState,
    PermissionStatus,
};
pub use platform::Platform;
pub use recognition::{
    latest_transcript, matches, normalize, RecognitionAlternative, RecognitionConfig,
    RecognitionEvent, RecognitionProvider, RecognitionResult, RecognitionSession, SessionEvent,
};
pub use store::{FlagStore, MemoryFlagStore, DISABLED_FLAG_KEY};

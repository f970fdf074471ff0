pub mod backend;
pub mod matcher;

pub use backend::{
    RecognitionAlternative, RecognitionConfig, RecognitionEvent, RecognitionProvider,
    RecognitionResult, RecognitionSession, SessionEvent,
};
pub use matcher::{latest_transcript, matches, normalize};

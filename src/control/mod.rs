//! The listening session controller.
//!
//! `SpeechControl` hands out event streams backed by logical listening
//! sessions. A driver task owns each session: it waits for microphone
//! permission, keeps restarting the physical recognition session as the
//! backend gives up, and forwards debounced results downstream.

mod controller;
mod driver;
mod shared;
mod stream;

pub use controller::SpeechControl;
pub use stream::{CommandStream, EventStream};

use crate::error::SpeechControlError;
use crate::recognition::RecognitionEvent;

/// Item carried by listening streams: a result batch or a terminal error.
pub(crate) type ListenItem = Result<RecognitionEvent, SpeechControlError>;

use std::sync::Arc;

use crate::notification::Notifier;
use crate::permission::{MediaAccess, MicrophonePermissions};
use crate::recognition::RecognitionProvider;
use crate::store::FlagStore;

/// Everything the controller needs from the host platform.
///
/// Cloning is cheap; all collaborators are shared.
#[derive(Clone)]
pub struct Platform {
    pub recognition: Arc<dyn RecognitionProvider>,
    pub permissions: Arc<dyn MicrophonePermissions>,
    pub media: Arc<dyn MediaAccess>,
    pub notifier: Arc<dyn Notifier>,
    pub flags: Arc<dyn FlagStore>,
}

impl Platform {
    pub fn new(
        recognition: Arc<dyn RecognitionProvider>,
        permissions: Arc<dyn MicrophonePermissions>,
        media: Arc<dyn MediaAccess>,
        notifier: Arc<dyn Notifier>,
        flags: Arc<dyn FlagStore>,
    ) -> Self {
        Self {
            recognition,
            permissions,
            media,
            notifier,
            flags,
        }
    }
}

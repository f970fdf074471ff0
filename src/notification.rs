use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Label on the notification's opt-out action.
pub const DEFAULT_DISMISS_LABEL: &str = "Disable";

/// Default notification text for a given recognition language.
pub fn default_text(language: &str) -> String {
    format!("I am listening for your search. Your language is {language}")
}

/// What the listening notification should say and where it should go.
///
/// Unset fields fall back to defaults when the notification is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Host-specific mount point for the notification, e.g. a DOM selector.
    pub container: Option<String>,
    pub text: Option<String>,
    pub dismiss_label: Option<String>,
}

impl NotificationConfig {
    /// Fills unset fields with the built-in defaults.
    pub fn resolved(mut self, language: &str) -> Self {
        if self.text.is_none() {
            self.text = Some(default_text(language));
        }
        if self.dismiss_label.is_none() {
            self.dismiss_label = Some(DEFAULT_DISMISS_LABEL.to_string());
        }
        self
    }
}

/// Live notification. `dismissed` resolves when the user activates the
/// opt-out action; it stays pending if the notification is hidden unused.
pub struct NotificationHandle {
    pub dismissed: oneshot::Receiver<()>,
}

/// Shows and hides the listening notification.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Shows the notification. The returned handle reports dismissal.
    async fn append(&self, config: NotificationConfig) -> Result<NotificationHandle>;

    /// Hides the notification if it is currently shown.
    fn remove(&self);
}

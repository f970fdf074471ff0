use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Tuning for the listening session controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// BCP 47 language tag for recognition, e.g. "en-US". Falls back to
    /// `locale` when unset.
    pub language: Option<String>,
    /// Locale reported in the default notification text.
    pub locale: String,
    /// Quiet window before a recognition result is forwarded. A newer result
    /// inside the window replaces the pending one.
    pub debounce_ms: u64,
    /// Delay before recognition restarts after a session ends or reports
    /// transient silence.
    pub restart_delay_ms: u64,
    /// How long the listening notification stays up before it is hidden.
    pub notification_auto_hide_ms: u64,
    /// Ask backends to keep sessions alive across utterances.
    pub continuous: bool,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            language: None,
            locale: "en-US".to_string(),
            debounce_ms: 300,
            restart_delay_ms: 1000,
            notification_auto_hide_ms: 3000,
            continuous: true,
        }
    }
}

impl ListenConfig {
    /// Loads configuration from a file, with `SPEECH_CONTROL_*` environment
    /// variables layered on top. Missing keys fall back to defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SPEECH_CONTROL"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Language tag used for recognition sessions and notification text.
    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(&self.locale)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn notification_auto_hide(&self) -> Duration {
        Duration::from_millis(self.notification_auto_hide_ms)
    }
}

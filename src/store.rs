use std::collections::HashMap;

use parking_lot::Mutex;

/// Key under which the user's opt-out is persisted.
pub const DISABLED_FLAG_KEY: &str = "speech-control.disabled";

/// Durable string flags. Backed by whatever the host keeps settings in; the
/// controller only needs get and set.
pub trait FlagStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// In-memory flag store. Flags last as long as the process.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }
}

/// Any non-empty stored value counts as disabled.
pub(crate) fn disabled_flag_set(store: &dyn FlagStore) -> bool {
    store
        .get(DISABLED_FLAG_KEY)
        .is_some_and(|value| !value.is_empty())
}

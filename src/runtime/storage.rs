//! Ephemeral hand-off storage between the privileged context and the panel.
//!
//! Context-menu clicks park the selected text here under a fixed key; the
//! panel takes it on its next read. Reads consume, so a value is delivered
//! exactly once no matter how many times the panel re-attaches.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const CHANGE_CAPACITY: usize = 16;

/// Fixed hand-off slots, one per context-menu action. The wire names are
/// the storage keys the panel watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandoffKey {
    #[serde(rename = "selectedText")]
    SelectedText,
    #[serde(rename = "quizText")]
    QuizText,
    #[serde(rename = "translateText")]
    TranslateText,
    #[serde(rename = "askaiText")]
    AskaiText,
}

impl HandoffKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandoffKey::SelectedText => "selectedText",
            HandoffKey::QuizText => "quizText",
            HandoffKey::TranslateText => "translateText",
            HandoffKey::AskaiText => "askaiText",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffEntry {
    pub text: String,
    pub stored_at: DateTime<Utc>,
}

struct StoreInner {
    entries: Mutex<HashMap<HandoffKey, HandoffEntry>>,
    changes: broadcast::Sender<HandoffKey>,
}

/// Shared across contexts by cloning; all clones see the same slots.
#[derive(Clone)]
pub struct HandoffStore {
    inner: Arc<StoreInner>,
}

impl Default for HandoffStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HandoffStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                entries: Mutex::new(HashMap::new()),
                changes,
            }),
        }
    }

    /// Park `text` under `key`, overwriting any unconsumed value, and
    /// notify watchers.
    pub fn store(&self, key: HandoffKey, text: impl Into<String>) {
        let entry = HandoffEntry {
            text: text.into(),
            stored_at: Utc::now(),
        };
        self.inner.entries.lock().insert(key, entry);
        log::debug!("hand-off stored under {}", key.as_str());
        let _ = self.inner.changes.send(key);
    }

    /// Consume the value under `key`, if any. A second take returns `None`.
    pub fn take(&self, key: HandoffKey) -> Option<HandoffEntry> {
        self.inner.entries.lock().remove(&key)
    }

    /// Watch for stores. The notification carries only the key; the value
    /// still has to be taken.
    pub fn watch(&self) -> broadcast::Receiver<HandoffKey> {
        self.inner.changes.subscribe()
    }
}

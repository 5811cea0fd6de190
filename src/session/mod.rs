//! Session-scoped persistence of the last viewport
//!
//! The store itself is external (browser `sessionStorage`, or whatever the
//! host provides). [`ViewStateStore`] layers the key format and JSON value
//! shape on top and swallows every failure: a corrupt entry reads as absent,
//! a failed write is logged and dropped.

use crate::{
    core::{constants::VIEWPORT_KEY_PREFIX, viewport::ViewportState},
    prelude::{Arc, HashMap, Mutex},
};

/// Failure reported by a [`SessionStore`] backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("session storage unavailable: {0}")]
    Unavailable(String),

    #[error("session storage quota exceeded")]
    QuotaExceeded,

    #[error("session storage operation failed: {0}")]
    Backend(String),
}

/// String key/value store scoped to the browsing session
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process [`SessionStore`]; lives as long as the value does
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("store lock poisoned".into())
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// Reads and writes one namespace's viewport in a [`SessionStore`]
#[derive(Clone)]
pub struct ViewStateStore {
    store: Arc<dyn SessionStore>,
}

impl ViewStateStore {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Storage key for `namespace`
    pub fn key(namespace: &str) -> String {
        format!("{VIEWPORT_KEY_PREFIX}{namespace}")
    }

    /// Last viewport saved under `namespace`. Missing, unreadable or
    /// malformed entries are all `None`.
    pub fn load(&self, namespace: &str) -> Option<ViewportState> {
        let key = Self::key(namespace);
        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("could not read {key}: {e}");
                return None;
            }
        };

        match serde_json::from_str::<ViewportState>(&raw) {
            Ok(view) if view.is_valid() => Some(view),
            Ok(_) => {
                log::warn!("ignoring out-of-range viewport in {key}");
                None
            }
            Err(e) => {
                log::warn!("ignoring corrupt viewport in {key}: {e}");
                None
            }
        }
    }

    /// Save `view` under `namespace`, replacing what was there. Never fails.
    pub fn save(&self, namespace: &str, view: &ViewportState) {
        let key = Self::key(namespace);
        let result = serde_json::to_string(view)
            .map_err(|e| StoreError::Backend(e.to_string()))
            .and_then(|json| self.store.set(&key, &json));

        if let Err(e) = result {
            log::warn!("could not persist viewport to {key}: {e}");
        }
    }

    pub fn clear(&self, namespace: &str) {
        let key = Self::key(namespace);
        if let Err(e) = self.store.remove(&key) {
            log::warn!("could not clear {key}: {e}");
        }
    }
}

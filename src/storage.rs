//! Key/value persistence over `localStorage`.
//!
//! Managers serialize their state as JSON blobs under the `lanedash.` prefix.
//! There is no cross-key transaction: each manager saves its own blob.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

pub const KEY_PREFIX: &str = "lanedash.";

#[derive(Clone, Debug, PartialEq)]
pub enum StorageError {
    Unavailable,
    Access(String),
    Serialize(String),
    Parse { key: String, message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "local storage is unavailable"),
            StorageError::Access(msg) => write!(f, "storage access failed: {msg}"),
            StorageError::Serialize(msg) => write!(f, "could not serialize value: {msg}"),
            StorageError::Parse { key, message } => {
                write!(f, "stored value for '{key}' is corrupt: {message}")
            }
        }
    }
}

impl std::error::Error for StorageError {}

pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store used by native tests and as a fallback when the browser
/// refuses access to `localStorage` (private mode, sandboxed iframes).
#[derive(Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

pub struct BrowserStorage {
    inner: web_sys::Storage,
}

impl BrowserStorage {
    pub fn open() -> Result<Self, StorageError> {
        let win = web_sys::window().ok_or(StorageError::Unavailable)?;
        let inner = win
            .local_storage()
            .map_err(|e| StorageError::Access(js_error_string(&e)))?
            .ok_or(StorageError::Unavailable)?;
        Ok(Self { inner })
    }
}

impl KeyValueStore for BrowserStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key).map_err(|e| StorageError::Access(js_error_string(&e)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set_item(key, value).map_err(|e| StorageError::Access(js_error_string(&e)))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove_item(key).map_err(|e| StorageError::Access(js_error_string(&e)))
    }
}

fn js_error_string(value: &wasm_bindgen::JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

pub fn storage_key(name: &str) -> String {
    format!("{KEY_PREFIX}{name}")
}

pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    name: &str,
) -> Result<Option<T>, StorageError> {
    let key = storage_key(name);
    match store.get_item(&key)? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Parse { key, message: e.to_string() }),
    }
}

pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    name: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Serialize(e.to_string()))?;
    store.set_item(&storage_key(name), &raw)
}

/// Lenient load: missing or corrupt blobs fall back to the default.
pub fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, name: &str) -> T {
    match load_json(store, name) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(err) => {
            log::warn!("{err}; using defaults");
            T::default()
        }
    }
}

/// Save and log on failure; persistence problems never interrupt play.
pub fn save_or_warn<T: Serialize>(store: &dyn KeyValueStore, name: &str, value: &T) -> bool {
    match save_json(store, name, value) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("failed to save '{name}': {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Blob {
        count: u32,
        name: String,
    }

    #[test]
    fn json_round_trip_uses_prefixed_key() {
        let store = MemoryStorage::new();
        let blob = Blob { count: 3, name: "x".into() };
        save_json(&store, "blob", &blob).unwrap();
        assert!(store.get_item("lanedash.blob").unwrap().is_some());
        let back: Option<Blob> = load_json(&store, "blob").unwrap();
        assert_eq!(back, Some(blob));
    }

    #[test]
    fn corrupt_blob_reports_parse_error_and_defaults() {
        let store = MemoryStorage::new();
        store.set_item("lanedash.blob", "{not json").unwrap();
        let err = load_json::<Blob>(&store, "blob").unwrap_err();
        assert!(matches!(err, StorageError::Parse { ref key, .. } if key == "lanedash.blob"));
        assert_eq!(load_or_default::<Blob>(&store, "blob"), Blob::default());
    }

    #[test]
    fn missing_blob_is_none() {
        let store = MemoryStorage::new();
        assert!(load_json::<Blob>(&store, "absent").unwrap().is_none());
        assert!(store.is_empty());
    }
}

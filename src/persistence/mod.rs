//! Key-value save storage
//!
//! The simulation never touches storage directly; it goes through
//! [`KeyValueStore`]. Implementations:
//! - [`MemoryStore`]: in-process map (tests, headless runs)
//! - [`JsonFileStore`]: native JSON file, written tmp -> rename
//! - [`LocalStorageStore`]: browser LocalStorage (wasm32 only)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(target_arch = "wasm32")]
mod local_storage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::JsonFileStore;
#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorageStore;

/// Persistent keys shared with the progression store
pub mod keys {
    pub const LIFETIME_MONEY: &str = "lifetimeMoney";
    pub const HP_LEVEL: &str = "hpLevel";
    pub const INVINCIBILITY_LEVEL: &str = "invincibilityLevel";
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("save data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage backend unavailable")]
    Unavailable,
}

/// Named integer storage. `set_int` is visible to `get_int` immediately;
/// `flush` makes it durable.
pub trait KeyValueStore {
    fn get_int(&self, key: &str, default: i64) -> i64;
    fn set_int(&mut self, key: &str, value: i64);
    fn flush(&mut self) -> Result<(), PersistenceError>;
}

/// In-memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    values: BTreeMap<String, i64>,
    #[serde(skip)]
    flushes: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing values
    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            flushes: 0,
        }
    }

    /// Number of times `flush` was called
    pub fn flush_count(&self) -> u32 {
        self.flushes
    }
}

impl KeyValueStore for MemoryStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        self.flushes += 1;
        Ok(())
    }
}

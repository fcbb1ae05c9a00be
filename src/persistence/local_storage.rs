//! Browser LocalStorage backend

use std::collections::BTreeMap;

use super::{KeyValueStore, PersistenceError};

/// Integer map stored as one JSON item in LocalStorage
#[derive(Debug)]
pub struct LocalStorageStore {
    item_key: String,
    values: BTreeMap<String, i64>,
}

impl LocalStorageStore {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }

    /// Load the item, starting empty if it is missing or unreadable
    pub fn load(item_key: &str) -> Self {
        let values = Self::storage()
            .and_then(|storage| storage.get_item(item_key).ok().flatten())
            .and_then(|json| serde_json::from_str(&json).ok());

        let values = match values {
            Some(values) => {
                log::info!("Loaded progression from LocalStorage");
                values
            }
            None => {
                log::info!("No saved progression found, starting fresh");
                BTreeMap::new()
            }
        };

        Self {
            item_key: item_key.to_string(),
            values,
        }
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        let storage = Self::storage().ok_or(PersistenceError::Unavailable)?;
        let json = serde_json::to_string(&self.values)?;
        storage
            .set_item(&self.item_key, &json)
            .map_err(|_| PersistenceError::Unavailable)?;
        Ok(())
    }
}

//! Native JSON save file

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, PersistenceError};

/// Integer map persisted as a JSON object.
///
/// Writes go to `<path>.tmp` first and are renamed over the save file so a
/// crash mid-write never leaves a truncated save behind.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, i64>,
    dirty: bool,
}

impl JsonFileStore {
    /// Open a save file, starting empty if it doesn't exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let values = if path.exists() {
            let json = fs::read_to_string(&path)?;
            let values: BTreeMap<String, i64> = serde_json::from_str(&json)?;
            log::info!("Loaded {} saved values from {}", values.len(), path.display());
            values
        } else {
            log::info!("No save file at {}, starting fresh", path.display());
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        if self.values.insert(key.to_string(), value) != Some(value) {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        log::debug!("Saved {} values to {}", self.values.len(), self.path.display());
        Ok(())
    }
}

//! Opaque key-value preferences persisted as one JSON object.

mod atomic_io;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings file {path} is not a JSON object: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode setting `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl SettingsStore {
    /// Store with no persisted values yet, writing to `path` on save.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: Map::new(),
        }
    }

    /// Reads the settings file. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::empty(path));
            }
            Err(source) => return Err(SettingsError::Read { path, source }),
        };
        let values: Map<String, Value> = serde_json::from_str(&raw)
            .map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), keys = values.len(), "settings_loaded");
        Ok(Self { path, values })
    }

    /// Like [`SettingsStore::load`], but a corrupt or unreadable file is logged and
    /// replaced by an empty store.
    pub fn load_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(path.clone()) {
            Ok(store) => store,
            Err(error) => {
                warn!(error = %error, "settings_load_failed_using_defaults");
                Self::empty(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Decodes the value stored under `key`. Values that no longer match `T` are logged
    /// and treated as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        match T::deserialize(value) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                warn!(key, error = %error, "settings_value_invalid");
                None
            }
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        self.get(key).unwrap_or(fallback)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), SettingsError> {
        let encoded = serde_json::to_value(value).map_err(|source| SettingsError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.values.insert(key.to_string(), encoded);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let text =
            serde_json::to_string_pretty(&self.values).map_err(|source| SettingsError::Encode {
                key: "*".to_string(),
                source,
            })?;
        atomic_io::write_text_atomic(&self.path, &text).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Stores `value` under `key` and saves immediately.
    pub fn persist<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), SettingsError> {
        self.set(key, value)?;
        self.save()
    }
}

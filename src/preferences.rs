//! Persisted user preferences (the remembered image directory).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Key under which the last chosen directory is stored.
pub const BASEDIR_KEY: &str = "basedir";

pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&mut self, key: &str, value: &str) -> Result<()>;
}

/// String map stored as a YAML file, rewritten on every `put`.
#[derive(Debug, Clone)]
pub struct YamlPreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl YamlPreferences {
    /// Load `path`, starting empty when the file is missing or unparsable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(s) => serde_yaml::from_str(&s).unwrap_or_else(|err| {
                warn!(path = %path.display(), "ignoring unreadable preferences: {err}");
                BTreeMap::new()
            }),
            Err(err) => {
                debug!(path = %path.display(), "no stored preferences: {err}");
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let fail = |message: String| Error::Preferences {
            path: self.path.clone(),
            message,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }
        let content = serde_yaml::to_string(&self.values).map_err(|e| fail(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| fail(e.to_string()))
    }
}

impl PreferenceStore for YamlPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}

/// Non-persistent store, for tests and `--dir` runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
}

impl MemoryPreferences {
    /// Start from the remembered directory in `store` without ever writing back to it.
    pub fn detached_from(store: &impl PreferenceStore) -> Self {
        let mut values = BTreeMap::new();
        if let Some(dir) = store.get(BASEDIR_KEY) {
            values.insert(BASEDIR_KEY.to_string(), dir);
        }
        Self { values }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

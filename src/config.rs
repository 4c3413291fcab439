//! Persisted per-user state: current image, favorites and active collections.
//!
//! The record lives in `config.json` next to `settings.toml`. Writes go to a
//! temporary sibling and are renamed into place so a reader never sees a
//! half-written file. There is no locking; two invocations racing on the
//! file is a known limitation.

use crate::collections::{self, ALL};
use crate::error::{Result, WallError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Identifier of the most recently applied image, empty if none yet
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,
}

fn default_collections() -> Vec<String> {
    vec![ALL.to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            current: String::new(),
            favorites: Vec::new(),
            collections: default_collections(),
        }
    }
}

impl Config {
    pub fn current(&self) -> Option<&str> {
        if self.current.is_empty() {
            None
        } else {
            Some(&self.current)
        }
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.iter().any(|f| f == id)
    }

    /// Repair a hand-edited record so the collection invariant holds
    fn normalize(&mut self) {
        let (valid, invalid) = collections::partition_names(&self.collections);
        for name in &invalid {
            tracing::warn!("Ignoring unknown collection '{}' in config", name);
        }
        self.collections = valid;

        let mut seen = Vec::with_capacity(self.favorites.len());
        self.favorites.retain(|f| {
            if f.is_empty() || seen.contains(f) {
                false
            } else {
                seen.push(f.clone());
                true
            }
        });
    }
}

pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory and a default record if either is missing
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir).map_err(|e| WallError::io(&self.dir, e))?;
        }

        if !self.path().is_file() {
            tracing::info!("Creating default config at {}", self.path().display());
            self.save(&Config::default())?;
        }

        Ok(())
    }

    pub fn load(&self) -> Result<Config> {
        let path = self.path();

        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WallError::ConfigMissing { path });
            }
            Err(e) => return Err(WallError::io(&path, e)),
        };

        let mut config: Config = serde_json::from_str(&data)
            .map_err(|source| WallError::ConfigCorrupt { path, source })?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        let path = self.path();
        let tmp = self.dir.join("config.json.tmp");

        let data = serde_json::to_string_pretty(config)
            .map_err(|e| WallError::io(&path, std::io::Error::other(e)))?;
        fs::write(&tmp, data).map_err(|e| WallError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| WallError::io(&path, e))?;

        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// `ensure_initialized` followed by `load`
    pub fn load_or_init(&self) -> Result<Config> {
        self.ensure_initialized()?;
        self.load()
    }

    /// Delete the persisted record; succeeds if it is already gone
    pub fn reset(&self) -> Result<()> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WallError::io(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (ConfigStore, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(tmp.path().join("stalenwall"));
        (store, tmp)
    }

    #[test]
    fn test_load_without_file_is_missing() {
        let (store, _tmp) = store();
        assert!(matches!(store.load(), Err(WallError::ConfigMissing { .. })));
    }

    #[test]
    fn test_ensure_initialized_writes_defaults() {
        let (store, _tmp) = store();
        store.ensure_initialized().unwrap();

        let config = store.load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.current(), None);
        assert_eq!(config.collections, vec!["ALL".to_string()]);
    }

    #[test]
    fn test_ensure_initialized_keeps_existing() {
        let (store, _tmp) = store();
        store.ensure_initialized().unwrap();

        let mut config = store.load().unwrap();
        config.current = "bilderbig/steel_01.jpg".into();
        store.save(&config).unwrap();

        store.ensure_initialized().unwrap();
        assert_eq!(store.load().unwrap().current, "bilderbig/steel_01.jpg");
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let (store, _tmp) = store();
        store.ensure_initialized().unwrap();
        store.save(&Config::default()).unwrap();

        assert!(store.path().exists());
        assert!(!store.dir().join("config.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let (store, _tmp) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.load(), Err(WallError::ConfigCorrupt { .. })));
    }

    #[test]
    fn test_hand_edited_file_is_normalized() {
        let (store, _tmp) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.path(),
            r#"{"favorites": ["a/x.jpg", "a/x.jpg", ""], "collections": ["Steel", "nope"]}"#,
        )
        .unwrap();

        let config = store.load().unwrap();
        assert_eq!(config.current, "");
        assert_eq!(config.favorites, vec!["a/x.jpg".to_string()]);
        assert_eq!(config.collections, vec!["steel".to_string()]);
    }

    #[test]
    fn test_empty_collections_fall_back_to_all() {
        let (store, _tmp) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path(), r#"{"current": "", "favorites": [], "collections": []}"#).unwrap();

        assert_eq!(store.load().unwrap().collections, vec!["ALL".to_string()]);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let (store, _tmp) = store();
        store.ensure_initialized().unwrap();

        store.reset().unwrap();
        assert!(matches!(store.load(), Err(WallError::ConfigMissing { .. })));
        store.reset().unwrap();
    }
}

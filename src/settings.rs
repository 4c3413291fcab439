use crate::error::{Result, WallError};
use crate::utils::expand_tilde;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.simonstalenhag.se/";

/// User-scoped directory holding settings.toml and config.json
pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("se", "stalenwall", "stalenwall")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| expand_tilde(Path::new("~/.stalenwall")))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub background: BackgroundSettings,
    #[serde(default)]
    pub timer: TimerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub images_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pick from the detected desktop session
    #[default]
    Auto,
    Gnome,
    Swww,
    Command,
    None,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackgroundSettings {
    #[serde(default)]
    pub backend: BackendKind,
    /// Command template for the `command` backend, `{}` is the image path
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    pub interval: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            images_dir: dirs::picture_dir()
                .map(|p| p.join("Stålenhag"))
                .unwrap_or_else(|| PathBuf::from("~/Pictures/Stålenhag")),
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            interval: "30m".to_string(),
        }
    }
}

impl Settings {
    pub fn settings_path(dir: &Path) -> PathBuf {
        dir.join("settings.toml")
    }

    /// Load settings from `dir`, writing defaults on first run
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::settings_path(dir);

        if path.exists() {
            let data = fs::read_to_string(&path).map_err(|e| WallError::io(&path, e))?;
            toml::from_str(&data).map_err(|source| WallError::Settings { path, source })
        } else {
            let settings = Settings::default();
            settings.save(dir)?;
            Ok(settings)
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| WallError::io(dir, e))?;
        let path = Self::settings_path(dir);
        let data = toml::to_string_pretty(self)
            .map_err(|e| WallError::io(&path, std::io::Error::other(e)))?;
        fs::write(&path, data).map_err(|e| WallError::io(&path, e))
    }

    /// Base URL, always ending in a slash
    pub fn base_url(&self) -> String {
        let base = self.source.base_url.trim();
        if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.images_dir)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs.max(1))
    }
}

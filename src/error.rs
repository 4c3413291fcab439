use crate::http::HttpError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WallError>;

#[derive(Debug, Error)]
pub enum WallError {
    #[error("no config at {}; run any command once to create it", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("config at {} is corrupt: {source}. Fix it by hand or run `stalenwall reset`", path.display())]
    ConfigCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "unknown collection(s): {}. Valid names: {}. Active: {}",
        invalid.join(", "),
        valid.join(", "),
        active_label(active)
    )]
    InvalidCollection {
        invalid: Vec<String>,
        valid: Vec<String>,
        /// Active setting at the time of the failed change (empty if unknown)
        active: Vec<String>,
    },

    #[error("failed to fetch gallery page {url}")]
    Network {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("failed to download {id}")]
    Download {
        id: String,
        #[source]
        source: HttpError,
    },

    #[error("no images found in the active collections")]
    EmptyCatalog,

    #[error("no image matches \"{filter}\"")]
    NoMatch { filter: String },

    #[error("no cached images to fall back to")]
    EmptyLocalCache,

    #[error("no favorites to choose from (add one with `stalenwall favorite add`)")]
    NoFavorites,

    #[error("failed to set background: {0}")]
    Background(String),

    #[error("invalid settings in {}: {source}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("timer: {0}")]
    Timer(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WallError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WallError::Io {
            path: path.into(),
            source,
        }
    }
}

fn active_label(active: &[String]) -> String {
    if active.is_empty() {
        "unknown".to_string()
    } else {
        active.join(", ")
    }
}

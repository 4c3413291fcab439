use crate::catalog::ImageId;
use crate::error::{Result, WallError};
use crate::http::Http;
use std::fs;
use std::path::{Path, PathBuf};

const PART_EXTENSION: &str = "jpg.part";

/// Create each directory if it does not exist yet
pub fn ensure_directories(dirs: &[&Path]) -> Result<()> {
    for dir in dirs {
        if !dir.is_dir() {
            fs::create_dir_all(dir).map_err(|e| WallError::io(*dir, e))?;
            tracing::info!("Created {}", dir.display());
        }
    }
    Ok(())
}

/// Result of [`WallpaperCache::fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// Already on disk, nothing downloaded
    Cached(PathBuf),
    Downloaded(PathBuf),
}

impl Fetched {
    pub fn into_path(self) -> PathBuf {
        match self {
            Fetched::Cached(p) | Fetched::Downloaded(p) => p,
        }
    }
}

/// Downloaded gallery images, one file per identifier. A file being present
/// is the only cache-hit signal; entries are never evicted.
#[derive(Debug, Clone)]
pub struct WallpaperCache {
    images_dir: PathBuf,
    base_url: String,
}

impl WallpaperCache {
    pub fn new(images_dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            images_dir: images_dir.into(),
            base_url: base_url.into(),
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn path_for(&self, id: &ImageId) -> PathBuf {
        self.images_dir.join(id.cache_file_name())
    }

    pub fn exists(&self, id: &ImageId) -> bool {
        self.path_for(id).is_file()
    }

    /// Download `id` unless it is already cached.
    ///
    /// The body is written to a `.part` file and renamed into place, so an
    /// interrupted download never leaves a truncated image behind.
    pub fn fetch<H: Http>(&self, http: &H, id: &ImageId) -> Result<Fetched> {
        let path = self.path_for(id);
        if self.exists(id) {
            tracing::debug!("Cache hit: {}", id);
            return Ok(Fetched::Cached(path));
        }

        ensure_directories(&[&self.images_dir])?;

        let url = id.remote_url(&self.base_url);
        let bytes = http.get_bytes(&url).map_err(|source| WallError::Download {
            id: id.to_string(),
            source,
        })?;

        let part = path.with_extension(PART_EXTENSION);
        fs::write(&part, &bytes).map_err(|e| WallError::io(&part, e))?;
        fs::rename(&part, &path).map_err(|e| WallError::io(&path, e))?;

        tracing::info!("Downloaded {} ({} bytes)", id, bytes.len());
        Ok(Fetched::Downloaded(path))
    }

    /// Cached image filenames, sorted. Empty if the directory is missing.
    pub fn list_local(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.images_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(WallError::io(&self.images_dir, e)),
        };

        let mut names: Vec<String> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && crate::utils::is_image_file(p))
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect();

        names.sort();
        Ok(names)
    }

    /// Delete unfinished downloads left by an aborted run
    pub fn remove_partial_downloads(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.images_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(WallError::io(&self.images_dir, e)),
        };

        let mut removed = 0;
        for path in entries.flatten().map(|e| e.path()) {
            let is_part = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".part"));
            if is_part && path.is_file() {
                fs::remove_file(&path).map_err(|e| WallError::io(&path, e))?;
                tracing::debug!("Removed {}", path.display());
                removed += 1;
            }
        }
        Ok(removed)
    }
}

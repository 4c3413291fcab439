//! Choosing images and keeping the favorites / current pointer up to date.

use crate::catalog::ImageId;
use crate::config::ConfigStore;
use crate::error::{Result, WallError};
use crate::wallpaper::WallpaperCache;
use rand::seq::IteratorRandom;
use rand::Rng;
use std::collections::BTreeSet;

/// Uniform choice over the whole catalog
pub fn pick_random_remote<R: Rng + ?Sized>(
    catalog: &BTreeSet<ImageId>,
    rng: &mut R,
) -> Result<ImageId> {
    catalog
        .iter()
        .choose(rng)
        .cloned()
        .ok_or(WallError::EmptyCatalog)
}

/// Uniform choice among identifiers containing `filter` (case-sensitive)
pub fn pick_filtered<R: Rng + ?Sized>(
    catalog: &BTreeSet<ImageId>,
    filter: &str,
    rng: &mut R,
) -> Result<ImageId> {
    catalog
        .iter()
        .filter(|id| id.as_str().contains(filter))
        .choose(rng)
        .cloned()
        .ok_or_else(|| WallError::NoMatch {
            filter: filter.to_string(),
        })
}

/// Uniform choice among cached images. `None` when nothing qualifies; this
/// is the offline path, not an error.
pub fn pick_random_local<R: Rng + ?Sized>(
    cache: &WallpaperCache,
    current: Option<&str>,
    exclude_current: bool,
    rng: &mut R,
) -> Result<Option<ImageId>> {
    let excluded = if exclude_current {
        current.map(|c| ImageId::new(c).cache_file_name())
    } else {
        None
    };

    Ok(cache
        .list_local()?
        .into_iter()
        .filter(|name| Some(name) != excluded.as_ref())
        .choose(rng)
        .map(|name| ImageId::from_cache_file_name(&name)))
}

/// Record `id` as the image on screen
pub fn mark_current(store: &ConfigStore, id: &ImageId) -> Result<()> {
    let mut config = store.load_or_init()?;
    config.current = id.to_string();
    store.save(&config)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteOutcome {
    Added(String),
    AlreadyFavorite(String),
    /// No image has been set yet
    NoCurrent,
}

/// Add the current image to favorites (exact match, no duplicates)
pub fn add_favorite(store: &ConfigStore) -> Result<FavoriteOutcome> {
    let mut config = store.load_or_init()?;

    let Some(current) = config.current().map(str::to_string) else {
        return Ok(FavoriteOutcome::NoCurrent);
    };

    if config.is_favorite(&current) {
        return Ok(FavoriteOutcome::AlreadyFavorite(current));
    }

    config.favorites.push(current.clone());
    store.save(&config)?;
    tracing::info!("Added favorite {}", current);
    Ok(FavoriteOutcome::Added(current))
}

/// Empty the favorites list; returns how many were removed
pub fn clear_favorites(store: &ConfigStore) -> Result<usize> {
    let mut config = store.load_or_init()?;
    let removed = config.favorites.len();
    config.favorites.clear();
    store.save(&config)?;
    Ok(removed)
}

/// Uniform choice among favorites other than the current image
pub fn pick_from_favorites<R: Rng + ?Sized>(
    store: &ConfigStore,
    rng: &mut R,
) -> Result<Option<ImageId>> {
    let config = store.load_or_init()?;
    let current = config.current();

    Ok(config
        .favorites
        .iter()
        .filter(|f| Some(f.as_str()) != current)
        .choose(rng)
        .map(ImageId::new))
}

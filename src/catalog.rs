//! Remote image discovery
//!
//! Gallery pages are plain HTML; images are found by matching the site's
//! folder convention (`bilderbig/<name>.jpg` and friends) anywhere in the
//! page source.

use crate::error::WallError;
use crate::http::Http;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

/// Folders on the site that hold full-size images
pub const GALLERY_FOLDERS: &[&str] = &["bilderbig", "bilder", "4k", "extrabilder"];

/// Separator replacing `/` in cache filenames. Never produced by the pattern.
const FILE_SEPARATOR: char = '-';

fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let folders = GALLERY_FOLDERS.join("|");
        Regex::new(&format!(r"\b(?:{})/[A-Za-z0-9_]+\.jpg", folders))
            .expect("gallery image pattern is valid")
    })
}

/// Site-relative path of one gallery image, e.g. `bilderbig/tftl_01.jpg`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn remote_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url, self.0)
    }

    /// Deterministic cache filename: path separators become `-`
    pub fn cache_file_name(&self) -> String {
        self.0.replace('/', &FILE_SEPARATOR.to_string())
    }

    /// Inverse of [`ImageId::cache_file_name`]
    pub fn from_cache_file_name(name: &str) -> Self {
        Self(name.replace(FILE_SEPARATOR, "/"))
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every image identifier mentioned in a page
pub fn extract_image_ids(page: &str) -> BTreeSet<ImageId> {
    image_pattern()
        .find_iter(page)
        .map(|m| ImageId::new(m.as_str()))
        .collect()
}

/// Outcome of listing one or more gallery pages
#[derive(Debug, Default)]
pub struct CatalogReport {
    pub images: BTreeSet<ImageId>,
    /// Pages that could not be fetched, with the reason
    pub failures: Vec<WallError>,
    pub pages_fetched: usize,
    /// Listing stopped early because the cancel flag was raised
    pub interrupted: bool,
}

impl CatalogReport {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }
}

pub struct CatalogFetcher<'a, H: Http> {
    http: &'a H,
    cancel: Option<&'a AtomicBool>,
}

impl<'a, H: Http> CatalogFetcher<'a, H> {
    pub fn new(http: &'a H) -> Self {
        Self { http, cancel: None }
    }

    /// Stop before the next page once `cancel` is raised
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|c| c.load(Ordering::SeqCst))
    }

    /// Fetch every page and merge the images found. A failing page is
    /// recorded and skipped; the rest are still fetched. No retries.
    pub fn list_remote_images(&self, urls: &[String]) -> CatalogReport {
        let mut report = CatalogReport::default();

        for url in urls {
            if self.cancelled() {
                tracing::info!("Interrupted, skipping remaining pages");
                report.interrupted = true;
                break;
            }

            match self.http.get_text(url) {
                Ok(page) => {
                    let found = extract_image_ids(&page);
                    tracing::debug!("{}: {} images", url, found.len());
                    report.images.extend(found);
                    report.pages_fetched += 1;
                }
                Err(source) => {
                    tracing::warn!("Skipping {}: {}", url, source);
                    report.failures.push(WallError::Network {
                        url: url.clone(),
                        source,
                    });
                }
            }
        }

        tracing::info!(
            "Found {} images on {}/{} pages",
            report.images.len(),
            report.pages_fetched,
            urls.len()
        );
        report
    }
}

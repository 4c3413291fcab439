//! Picking, caching and applying a background in one go, plus the bulk
//! "download everything" operation.

use crate::background::BackgroundSetter;
use crate::catalog::{CatalogFetcher, CatalogReport, ImageId};
use crate::collections;
use crate::config::{Config, ConfigStore};
use crate::error::{Result, WallError};
use crate::http::Http;
use crate::selection;
use crate::wallpaper::{ensure_directories, Fetched, WallpaperCache};
use rand::Rng;
use std::error::Error as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Random,
    /// Only identifiers containing this substring
    Filtered(String),
    Favorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Favorite,
    /// Network path failed, picked from the local cache
    LocalFallback,
}

#[derive(Debug, Clone)]
pub struct Applied {
    pub id: ImageId,
    pub path: PathBuf,
    pub source: Source,
    pub downloaded: bool,
}

#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub found: usize,
    pub downloaded: usize,
    pub cached: usize,
    pub failed: Vec<ImageId>,
    pub page_failures: usize,
    pub interrupted: bool,
}

pub struct Rotator<'a, H: Http> {
    store: &'a ConfigStore,
    cache: &'a WallpaperCache,
    http: &'a H,
    setter: &'a dyn BackgroundSetter,
    base_url: String,
}

impl<'a, H: Http> Rotator<'a, H> {
    pub fn new(
        store: &'a ConfigStore,
        cache: &'a WallpaperCache,
        http: &'a H,
        setter: &'a dyn BackgroundSetter,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            http,
            setter,
            base_url: base_url.into(),
        }
    }

    fn prepare(&self) -> Result<Config> {
        ensure_directories(&[self.cache.images_dir(), self.store.dir()])?;
        self.store.load_or_init()
    }

    /// Images available for the active collections
    pub fn catalog(&self, config: &Config) -> Result<CatalogReport> {
        let urls = collections::resolve(&config.collections, &self.base_url)?;
        Ok(CatalogFetcher::new(self.http).list_remote_images(&urls))
    }

    fn select_remote<R: Rng + ?Sized>(
        &self,
        config: &Config,
        mode: &Mode,
        rng: &mut R,
    ) -> Result<(ImageId, Fetched)> {
        let id = match mode {
            Mode::Favorites => {
                selection::pick_from_favorites(self.store, rng)?.ok_or(WallError::NoFavorites)?
            }
            Mode::Random => {
                let report = self.catalog(config)?;
                selection::pick_random_remote(&report.images, rng)?
            }
            Mode::Filtered(filter) => {
                let report = self.catalog(config)?;
                if report.is_empty() {
                    return Err(WallError::EmptyCatalog);
                }
                selection::pick_filtered(&report.images, filter, rng)?
            }
        };

        let fetched = self.cache.fetch(self.http, &id)?;
        Ok((id, fetched))
    }

    fn select_local<R: Rng + ?Sized>(&self, config: &Config, rng: &mut R) -> Result<ImageId> {
        let current = config.current();
        if let Some(id) = selection::pick_random_local(self.cache, current, true, rng)? {
            return Ok(id);
        }
        // Nothing but the current image is cached
        selection::pick_random_local(self.cache, current, false, rng)?
            .ok_or(WallError::EmptyLocalCache)
    }

    /// Choose an image, make sure it is cached, apply it and record it as
    /// current. An empty catalog or a failed download falls back to the
    /// local cache; every other error is returned as is.
    pub fn rotate<R: Rng + ?Sized>(&self, mode: &Mode, rng: &mut R) -> Result<Applied> {
        let config = self.prepare()?;

        let (id, path, source, downloaded) = match self.select_remote(&config, mode, rng) {
            Ok((id, fetched)) => {
                let downloaded = matches!(fetched, Fetched::Downloaded(_));
                let source = if *mode == Mode::Favorites {
                    Source::Favorite
                } else {
                    Source::Remote
                };
                (id, fetched.into_path(), source, downloaded)
            }
            Err(e @ (WallError::EmptyCatalog | WallError::Download { .. })) => {
                tracing::warn!("{}; falling back to cached images", e);
                let id = self.select_local(&config, rng)?;
                let path = self.cache.path_for(&id);
                (id, path, Source::LocalFallback, false)
            }
            Err(e) => return Err(e),
        };

        let path = path.canonicalize().map_err(|e| WallError::io(&path, e))?;
        self.setter.apply(&path)?;
        selection::mark_current(self.store, &id)?;
        tracing::info!("Background set to {}", id);

        Ok(Applied {
            id,
            path,
            source,
            downloaded,
        })
    }

    /// Download every image of the active collections that is not cached
    /// yet. Failures are logged and counted; `cancel` stops the loop before
    /// the next image.
    pub fn download_all(&self, cancel: &AtomicBool) -> Result<DownloadSummary> {
        let config = self.prepare()?;
        let urls = collections::resolve(&config.collections, &self.base_url)?;
        let report = CatalogFetcher::new(self.http)
            .with_cancel(cancel)
            .list_remote_images(&urls);

        let mut summary = DownloadSummary {
            found: report.len(),
            page_failures: report.failures.len(),
            interrupted: report.interrupted,
            ..Default::default()
        };
        let total = report.len();

        for (index, id) in report.images.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                summary.interrupted = true;
                break;
            }

            match self.cache.fetch(self.http, id) {
                Ok(Fetched::Cached(_)) => summary.cached += 1,
                Ok(Fetched::Downloaded(_)) => {
                    summary.downloaded += 1;
                    eprintln!("{}/{}) {}", index + 1, total, id);
                }
                Err(e) => {
                    match e.source() {
                        Some(cause) => tracing::warn!("{}: {}", e, cause),
                        None => tracing::warn!("{}", e),
                    }
                    eprintln!("{}/{}) {} FAILED", index + 1, total, id);
                    summary.failed.push(id.clone());
                }
            }
        }

        if cancel.load(Ordering::SeqCst) {
            summary.interrupted = true;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeHttp;
    use crate::http::HttpError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    const BASE: &str = "http://t/";
    const STEEL: &str = r#"<a href="bilderbig/steel_1.jpg"></a><a href="bilderbig/steel_2.jpg"></a>"#;
    const PALEO: &str = r#"<a href="4k/paleo_1.jpg"></a>"#;

    #[derive(Default)]
    struct RecordingSetter {
        applied: RefCell<Vec<PathBuf>>,
        fail: bool,
    }

    impl BackgroundSetter for RecordingSetter {
        fn apply(&self, path: &Path) -> Result<()> {
            if self.fail {
                return Err(WallError::Background("no display".into()));
            }
            self.applied.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    struct Env {
        store: ConfigStore,
        cache: WallpaperCache,
        _tmp: tempfile::TempDir,
    }

    fn env() -> Env {
        let tmp = tempfile::tempdir().unwrap();
        Env {
            store: ConfigStore::new(tmp.path().join("config")),
            cache: WallpaperCache::new(tmp.path().join("images"), BASE),
            _tmp: tmp,
        }
    }

    fn online() -> FakeHttp {
        FakeHttp::default()
            .with_page("http://t/steel.html", STEEL)
            .with_page("http://t/paleo.html", PALEO)
            .with_image("http://t/bilderbig/steel_1.jpg", b"s1")
            .with_image("http://t/bilderbig/steel_2.jpg", b"s2")
            .with_image("http://t/4k/paleo_1.jpg", b"p1")
    }

    fn seed_cache(cache: &WallpaperCache, names: &[&str]) {
        fs::create_dir_all(cache.images_dir()).unwrap();
        for name in names {
            fs::write(cache.images_dir().join(name), b"x").unwrap();
        }
    }

    #[test]
    fn test_rotate_fresh_environment() {
        let env = env();
        let http = online();
        let setter = RecordingSetter::default();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);
        let mut rng = StdRng::seed_from_u64(4);

        let applied = rotator.rotate(&Mode::Random, &mut rng).unwrap();

        assert_eq!(applied.source, Source::Remote);
        assert!(applied.downloaded);
        assert!(applied.path.is_absolute());
        assert_eq!(env.cache.list_local().unwrap(), vec![applied.id.cache_file_name()]);
        assert_eq!(env.store.load().unwrap().current, applied.id.to_string());
        assert_eq!(*setter.applied.borrow(), vec![applied.path.clone()]);
    }

    #[test]
    fn test_rotate_respects_active_collections() {
        let env = env();
        let http = online();
        let setter = RecordingSetter::default();
        collections::set_active(&env.store, &["paleo".to_string()]).unwrap();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);
        let mut rng = StdRng::seed_from_u64(4);

        let applied = rotator.rotate(&Mode::Random, &mut rng).unwrap();
        assert_eq!(applied.id, ImageId::new("4k/paleo_1.jpg"));
        assert_eq!(http.requests_for("http://t/steel.html"), 0);
    }

    #[test]
    fn test_rotate_with_partially_failing_pages() {
        let env = env();
        // Only steel.html exists; every other collection page 404s
        let http = FakeHttp::default()
            .with_page("http://t/steel.html", STEEL)
            .with_image("http://t/bilderbig/steel_1.jpg", b"s1")
            .with_image("http://t/bilderbig/steel_2.jpg", b"s2");
        let setter = RecordingSetter::default();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);
        let mut rng = StdRng::seed_from_u64(2);

        let applied = rotator.rotate(&Mode::Random, &mut rng).unwrap();
        assert!(applied.id.as_str().starts_with("bilderbig/steel_"));
    }

    #[test]
    fn test_rotate_offline_falls_back_to_cache() {
        let env = env();
        let names = ["bilderbig-a.jpg", "bilderbig-b.jpg", "4k-c.jpg"];
        seed_cache(&env.cache, &names);
        let http = FakeHttp::offline();
        let setter = RecordingSetter::default();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);
        let mut rng = StdRng::seed_from_u64(8);

        for _ in 0..10 {
            let applied = rotator.rotate(&Mode::Random, &mut rng).unwrap();
            assert_eq!(applied.source, Source::LocalFallback);
            assert!(names.contains(&applied.id.cache_file_name().as_str()));
        }
    }

    #[test]
    fn test_rotate_offline_skips_current_when_possible() {
        let env = env();
        seed_cache(&env.cache, &["bilderbig-a.jpg", "bilderbig-b.jpg"]);
        selection::mark_current(&env.store, &ImageId::new("bilderbig/a.jpg")).unwrap();
        let http = FakeHttp::offline();
        let setter = RecordingSetter::default();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);
        let mut rng = StdRng::seed_from_u64(8);

        let applied = rotator.rotate(&Mode::Random, &mut rng).unwrap();
        assert_eq!(applied.id, ImageId::new("bilderbig/b.jpg"));
    }

    #[test]
    fn test_rotate_offline_with_empty_cache_changes_nothing() {
        let env = env();
        selection::mark_current(&env.store, &ImageId::new("bilderbig/a.jpg")).unwrap();
        let http = FakeHttp::offline();
        let setter = RecordingSetter::default();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);
        let mut rng = StdRng::seed_from_u64(8);

        assert!(matches!(
            rotator.rotate(&Mode::Random, &mut rng),
            Err(WallError::EmptyLocalCache)
        ));
        assert!(setter.applied.borrow().is_empty());
        assert_eq!(env.store.load().unwrap().current, "bilderbig/a.jpg");
    }

    #[test]
    fn test_rotate_download_failure_falls_back() {
        let env = env();
        seed_cache(&env.cache, &["bilderbig-old.jpg"]);
        // Pages load, but the image itself 404s
        let http = FakeHttp::default().with_page("http://t/steel.html", STEEL);
        let setter = RecordingSetter::default();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);
        let mut rng = StdRng::seed_from_u64(1);

        let applied = rotator.rotate(&Mode::Random, &mut rng).unwrap();
        assert_eq!(applied.source, Source::LocalFallback);
        assert_eq!(applied.id, ImageId::new("bilderbig/old.jpg"));
    }

    #[test]
    fn test_rotate_filter_without_match_is_an_error() {
        let env = env();
        seed_cache(&env.cache, &["bilderbig-old.jpg"]);
        let http = online();
        let setter = RecordingSetter::default();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(
            rotator.rotate(&Mode::Filtered("tftl".into()), &mut rng),
            Err(WallError::NoMatch { .. })
        ));

        let applied = rotator.rotate(&Mode::Filtered("paleo".into()), &mut rng).unwrap();
        assert_eq!(applied.id, ImageId::new("4k/paleo_1.jpg"));
    }

    #[test]
    fn test_rotate_failed_setter_keeps_current() {
        let env = env();
        let http = online();
        let setter = RecordingSetter {
            fail: true,
            ..Default::default()
        };
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(
            rotator.rotate(&Mode::Random, &mut rng),
            Err(WallError::Background(_))
        ));
        assert_eq!(env.store.load().unwrap().current, "");
    }

    #[test]
    fn test_rotate_favorites() {
        let env = env();
        let http = online();
        let setter = RecordingSetter::default();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(
            rotator.rotate(&Mode::Favorites, &mut rng),
            Err(WallError::NoFavorites)
        ));

        selection::mark_current(&env.store, &ImageId::new("4k/paleo_1.jpg")).unwrap();
        selection::add_favorite(&env.store).unwrap();
        selection::mark_current(&env.store, &ImageId::new("bilderbig/steel_1.jpg")).unwrap();

        let applied = rotator.rotate(&Mode::Favorites, &mut rng).unwrap();
        assert_eq!(applied.source, Source::Favorite);
        assert_eq!(applied.id, ImageId::new("4k/paleo_1.jpg"));
        // Favorites are identifiers already; no gallery page is needed
        assert_eq!(http.requests_for("http://t/paleo.html"), 0);
    }

    #[test]
    fn test_download_all_skips_cached_and_counts_failures() {
        let env = env();
        seed_cache(&env.cache, &["bilderbig-steel_1.jpg"]);
        let http = FakeHttp::default()
            .with_page("http://t/steel.html", STEEL)
            .with_page("http://t/paleo.html", PALEO)
            .with_image("http://t/4k/paleo_1.jpg", b"p1");
        let setter = RecordingSetter::default();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);

        let summary = rotator.download_all(&AtomicBool::new(false)).unwrap();

        assert_eq!(summary.found, 3);
        assert_eq!(summary.cached, 1);
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failed, vec![ImageId::new("bilderbig/steel_2.jpg")]);
        assert_eq!(summary.page_failures, crate::collections::Collection::EVERY.len() - 2);
        assert!(!summary.interrupted);
        assert_eq!(env.cache.list_local().unwrap().len(), 2);
        assert_eq!(http.requests_for("http://t/bilderbig/steel_1.jpg"), 0);
    }

    /// Raises the cancel flag as soon as the first image is downloaded
    struct InterruptAfterFirst<'a> {
        inner: FakeHttp,
        cancel: &'a AtomicBool,
    }

    impl Http for InterruptAfterFirst<'_> {
        fn get_text(&self, url: &str) -> std::result::Result<String, HttpError> {
            self.inner.get_text(url)
        }

        fn get_bytes(&self, url: &str) -> std::result::Result<Vec<u8>, HttpError> {
            let bytes = self.inner.get_bytes(url);
            self.cancel.store(true, Ordering::SeqCst);
            bytes
        }
    }

    #[test]
    fn test_download_all_stops_on_interrupt() {
        let env = env();
        let cancel = AtomicBool::new(false);
        let http = InterruptAfterFirst {
            inner: online(),
            cancel: &cancel,
        };
        let setter = RecordingSetter::default();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);

        let summary = rotator.download_all(&cancel).unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.downloaded, 1);
        let local = env.cache.list_local().unwrap();
        assert_eq!(local.len(), 1);
        assert!(fs::read(env.cache.images_dir().join(&local[0])).unwrap().len() == 2);
        assert_eq!(env.store.load().unwrap(), Config::default());
    }

    struct InterruptOnFirstPage<'a> {
        inner: FakeHttp,
        cancel: &'a AtomicBool,
    }

    impl Http for InterruptOnFirstPage<'_> {
        fn get_text(&self, url: &str) -> std::result::Result<String, HttpError> {
            self.cancel.store(true, Ordering::SeqCst);
            self.inner.get_text(url)
        }

        fn get_bytes(&self, url: &str) -> std::result::Result<Vec<u8>, HttpError> {
            self.inner.get_bytes(url)
        }
    }

    #[test]
    fn test_download_all_interrupted_while_listing() {
        let env = env();
        let cancel = AtomicBool::new(false);
        let http = InterruptOnFirstPage {
            inner: online(),
            cancel: &cancel,
        };
        let setter = RecordingSetter::default();
        let rotator = Rotator::new(&env.store, &env.cache, &http, &setter, BASE);

        let summary = rotator.download_all(&cancel).unwrap();

        assert!(summary.interrupted);
        assert_eq!(http.inner.request_count(), 1);
        assert_eq!(summary.downloaded, 0);
        assert!(env.cache.list_local().unwrap().is_empty());
    }
}

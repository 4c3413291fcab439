mod background;
mod catalog;
mod collections;
mod config;
mod error;
mod http;
mod rotate;
mod selection;
mod settings;
mod timer;
mod utils;
mod wallpaper;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ConfigStore;
use crate::rotate::{Mode, Rotator, Source};
use crate::settings::Settings;
use crate::wallpaper::WallpaperCache;

#[derive(Parser)]
#[command(name = "stalenwall")]
#[command(version)]
#[command(about = "Desktop backgrounds from Simon Stålenhag's gallery")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Image cache directory (overrides settings.toml)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Set a random image as background (default)
    Random {
        /// Only pick images whose name contains this text (case-sensitive)
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Manage favorites
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },
    /// Choose which collections to pick from
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },
    /// Download every image of the active collections
    DownloadAll,
    /// Rotate the background periodically (systemd user timer)
    Timer {
        #[command(subcommand)]
        action: TimerAction,
    },
    /// Show current image, favorites and active collections
    Status,
    /// Delete the saved state (current image, favorites, collections)
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum FavoriteAction {
    /// Add the current background to favorites
    Add,
    /// Remove all favorites
    Clear,
    /// List favorites
    List,
    /// Set a random favorite as background
    Set,
}

#[derive(Subcommand)]
enum CollectionAction {
    /// List collections
    List,
    /// Set the active collections (use ALL for every collection)
    Set {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand)]
enum TimerAction {
    /// Install and start the timer
    Enable {
        /// Rotation interval (e.g., "30m", "1h", "90s")
        #[arg(short, long)]
        interval: Option<String>,
    },
    /// Stop and remove the timer
    Disable,
    /// Show whether the timer is running
    Status,
}

struct App {
    settings: Settings,
    store: ConfigStore,
    cache: WallpaperCache,
    /// `--dir` as given, forwarded to timer runs
    dir_override: Option<PathBuf>,
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "stalenwall=debug,info"
    } else {
        "stalenwall=warn"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config_dir = settings::config_dir();
    let settings = Settings::load(&config_dir)?;
    let dir_override = cli.dir.as_deref().map(utils::expand_tilde);
    let images_dir = dir_override
        .clone()
        .unwrap_or_else(|| settings.images_dir());

    let app = App {
        store: ConfigStore::new(&config_dir),
        cache: WallpaperCache::new(images_dir, settings.base_url()),
        settings,
        dir_override,
    };

    match cli.command.unwrap_or(Commands::Random { filter: None }) {
        Commands::Random { filter } => {
            let mode = match filter {
                Some(f) => Mode::Filtered(f),
                None => Mode::Random,
            };
            cmd_rotate(&app, mode)?;
        }
        Commands::Favorite { action } => cmd_favorite(&app, action)?,
        Commands::Collection { action } => cmd_collection(&app, action)?,
        Commands::DownloadAll => cmd_download_all(&app)?,
        Commands::Timer { action } => cmd_timer(&app, action)?,
        Commands::Status => cmd_status(&app)?,
        Commands::Reset { yes } => cmd_reset(&app, yes)?,
    }

    Ok(())
}

fn http_client(settings: &Settings) -> Result<http::HttpClient> {
    http::HttpClient::new(settings.timeout()).context("Failed to create HTTP client")
}

fn cmd_rotate(app: &App, mode: Mode) -> Result<()> {
    let http = http_client(&app.settings)?;
    let desktop = background::Desktop::detect();
    let setter = background::from_settings(&app.settings.background, &desktop)?;
    let rotator = Rotator::new(
        &app.store,
        &app.cache,
        &http,
        &*setter,
        app.settings.base_url(),
    );

    let applied = rotator
        .rotate(&mode, &mut rand::thread_rng())
        .context("No background change applied")?;

    match applied.source {
        Source::LocalFallback => println!("Offline, using cached image"),
        Source::Favorite => println!("From favorites"),
        Source::Remote if applied.downloaded => println!("Downloaded {}", applied.id),
        Source::Remote => {}
    }
    println!("Set image {}", applied.path.display());

    Ok(())
}

fn cmd_favorite(app: &App, action: FavoriteAction) -> Result<()> {
    use selection::FavoriteOutcome;

    match action {
        FavoriteAction::Add => match selection::add_favorite(&app.store)? {
            FavoriteOutcome::Added(id) => println!("✓ Added {} to favorites", id),
            FavoriteOutcome::AlreadyFavorite(id) => println!("{} is already a favorite", id),
            FavoriteOutcome::NoCurrent => {
                println!("No background set yet. Run 'stalenwall random' first.")
            }
        },
        FavoriteAction::Clear => {
            let removed = selection::clear_favorites(&app.store)?;
            println!("✓ Removed {} favorite(s)", removed);
        }
        FavoriteAction::List => {
            let config = app.store.load_or_init()?;
            if config.favorites.is_empty() {
                println!("No favorites yet.");
                println!("Add the current background with: stalenwall favorite add");
            } else {
                println!("Favorites:");
                for fav in &config.favorites {
                    let marker = if config.current() == Some(fav.as_str()) { "*" } else { " " };
                    println!(" {} {}", marker, fav);
                }
            }
        }
        FavoriteAction::Set => cmd_rotate(app, Mode::Favorites)?,
    }

    Ok(())
}

fn cmd_collection(app: &App, action: CollectionAction) -> Result<()> {
    match action {
        CollectionAction::List => {
            let config = app.store.load_or_init()?;
            let active = |name: &str| config.collections.iter().any(|c| c == name);

            println!("Collections:");
            let mark = if active(collections::ALL) { "*" } else { " " };
            println!(" {} {:<10} every collection", mark, collections::ALL);
            for c in collections::Collection::EVERY {
                let mark = if active(c.name()) { "*" } else { " " };
                println!(" {} {:<10} {}", mark, c.name(), c.display_name());
            }
        }
        CollectionAction::Set { names } => {
            let scope = collections::set_active(&app.store, &names)?;
            println!("✓ Active collections: {}", scope.names().join(", "));
        }
    }

    Ok(())
}

/// Flag raised by the first Ctrl-C, listened for on a background thread.
/// A second Ctrl-C removes unfinished downloads and exits right away.
fn interrupt_flag(cache: &WallpaperCache) -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal listener")?;

    let raised = flag.clone();
    let cache = cache.clone();
    std::thread::spawn(move || {
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            eprintln!("\nInterrupted, stopping after the current image (Ctrl-C again to quit now)...");
            raised.store(true, Ordering::SeqCst);

            if tokio::signal::ctrl_c().await.is_ok() {
                if let Err(e) = cache.remove_partial_downloads() {
                    tracing::warn!("{}", e);
                }
                std::process::exit(130);
            }
        });
    });

    Ok(flag)
}

fn cmd_download_all(app: &App) -> Result<()> {
    let http = http_client(&app.settings)?;
    let setter = background::PrintOnly;
    let rotator = Rotator::new(&app.store, &app.cache, &http, &setter, app.settings.base_url());
    let cancel = interrupt_flag(&app.cache)?;

    let summary = rotator.download_all(&cancel)?;

    println!("Found {} images", summary.found);
    if summary.page_failures > 0 {
        println!("  {} gallery page(s) could not be loaded", summary.page_failures);
    }
    println!("  Downloaded:     {}", summary.downloaded);
    println!("  Already cached: {}", summary.cached);
    println!("  Failed:         {}", summary.failed.len());
    if summary.interrupted {
        println!("Interrupted before finishing.");
    }

    Ok(())
}

fn cmd_timer(app: &App, action: TimerAction) -> Result<()> {
    let mut timer = timer::Timer::for_current_exe()?;
    if let Some(dir) = &app.dir_override {
        timer = timer.with_images_dir(dir.canonicalize().unwrap_or_else(|_| dir.clone()));
    }

    match action {
        TimerAction::Enable { interval } => {
            let interval = interval.unwrap_or_else(|| app.settings.timer.interval.clone());
            timer.enable(&interval)?;
            println!("✓ Background will change every {}", interval);
        }
        TimerAction::Disable => {
            timer.disable()?;
            println!("✓ Timer disabled");
        }
        TimerAction::Status => println!("Timer: {}", timer_label(timer.status())),
    }

    Ok(())
}

fn timer_label(status: timer::TimerStatus) -> &'static str {
    match status {
        timer::TimerStatus::Active => "active",
        timer::TimerStatus::Inactive => "installed, not running",
        timer::TimerStatus::NotInstalled => "not installed",
    }
}

fn cmd_status(app: &App) -> Result<()> {
    let config = app.store.load_or_init()?;
    let cached = app.cache.list_local()?.len();

    println!("Current:     {}", config.current().unwrap_or("(none)"));
    println!("Favorites:   {}", config.favorites.len());
    println!("Collections: {}", config.collections.join(", "));
    println!("Cached:      {} in {}", cached, app.cache.images_dir().display());
    println!("Config:      {}", app.store.path().display());
    if let Ok(timer) = timer::Timer::for_current_exe() {
        println!("Timer:       {}", timer_label(timer.status()));
    }

    Ok(())
}

fn cmd_reset(app: &App, yes: bool) -> Result<()> {
    let confirmed = yes
        || dialoguer::Confirm::new()
            .with_prompt("Forget current image, favorites and collection choice?")
            .default(false)
            .interact()?;

    if !confirmed {
        println!("Nothing changed.");
        return Ok(());
    }

    app.store.reset()?;
    app.store.ensure_initialized()?;
    println!("✓ Config reset to defaults");
    Ok(())
}

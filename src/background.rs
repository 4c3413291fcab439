//! Desktop background backends
//!
//! The selection logic only hands over an existing absolute path; applying it
//! is up to one of the backends below.

use crate::error::{Result, WallError};
use crate::settings::{BackendKind, BackgroundSettings};
use std::path::Path;
use std::process::Command;

pub trait BackgroundSetter {
    fn apply(&self, path: &Path) -> Result<()>;
}

/// Desktop session, detected once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Desktop {
    pub current_desktop: String,
    pub wayland: bool,
}

impl Desktop {
    pub fn detect() -> Self {
        Self {
            current_desktop: std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default(),
            wayland: std::env::var_os("WAYLAND_DISPLAY").is_some(),
        }
    }

    pub fn is_gnome(&self) -> bool {
        self.current_desktop
            .split(':')
            .any(|d| d.eq_ignore_ascii_case("gnome") || d.eq_ignore_ascii_case("unity"))
    }

    /// Backend to use when the settings say `auto`
    pub fn preferred_backend(&self) -> BackendKind {
        if self.wayland && !self.is_gnome() {
            BackendKind::Swww
        } else {
            BackendKind::Gnome
        }
    }
}

/// Build the configured backend
pub fn from_settings(settings: &BackgroundSettings, desktop: &Desktop) -> Result<Box<dyn BackgroundSetter>> {
    let kind = match settings.backend {
        BackendKind::Auto => desktop.preferred_backend(),
        other => other,
    };
    tracing::debug!("Background backend: {:?} (desktop {:?})", kind, desktop.current_desktop);

    Ok(match kind {
        BackendKind::Gnome | BackendKind::Auto => Box::new(Gnome),
        BackendKind::Swww => Box::new(Swww),
        BackendKind::Command => {
            let template = settings.command.clone().ok_or_else(|| {
                WallError::Background("backend \"command\" needs [background] command".into())
            })?;
            Box::new(CommandTemplate { template })
        }
        BackendKind::None => Box::new(PrintOnly),
    })
}

fn run(cmd: &mut Command, what: &str) -> Result<()> {
    let output = cmd
        .output()
        .map_err(|e| WallError::Background(format!("failed to run {}: {}", what, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(WallError::Background(format!("{} failed: {}", what, stderr.trim())));
    }

    Ok(())
}

/// `file://` URI with the path percent-encoded
fn file_uri(path: &Path) -> Result<String> {
    url::Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| WallError::Background(format!("not an absolute path: {}", path.display())))
}

/// GNOME / Unity via gsettings
pub struct Gnome;

impl BackgroundSetter for Gnome {
    fn apply(&self, path: &Path) -> Result<()> {
        let uri = file_uri(path)?;
        for key in ["picture-uri", "picture-uri-dark"] {
            let result = run(
                Command::new("gsettings")
                    .args(["set", "org.gnome.desktop.background", key])
                    .arg(&uri),
                "gsettings",
            );
            // Older GNOME has no dark variant
            if key == "picture-uri" {
                result?;
            } else if let Err(e) = result {
                tracing::debug!("Skipping {}: {}", key, e);
            }
        }
        Ok(())
    }
}

/// Wayland compositors via swww
pub struct Swww;

impl Swww {
    /// Start swww-daemon if it is not running
    fn ensure_daemon() -> Result<()> {
        let status = Command::new("swww").arg("query").output();

        match status {
            Ok(output) if output.status.success() => Ok(()),
            _ => {
                Command::new("swww-daemon")
                    .spawn()
                    .map_err(|e| WallError::Background(format!("failed to start swww-daemon: {}", e)))?;

                std::thread::sleep(std::time::Duration::from_millis(100));
                Ok(())
            }
        }
    }
}

impl BackgroundSetter for Swww {
    fn apply(&self, path: &Path) -> Result<()> {
        Self::ensure_daemon()?;
        run(
            Command::new("swww")
                .arg("img")
                .arg(path)
                .args(["--transition-type", "fade"]),
            "swww",
        )
    }
}

/// User command, `{}` replaced by the image path
pub struct CommandTemplate {
    pub template: String,
}

impl CommandTemplate {
    fn argv(&self, path: &Path) -> Vec<String> {
        let path = path.display().to_string();
        let mut argv: Vec<String> = self
            .template
            .split_whitespace()
            .map(|part| part.replace("{}", &path))
            .collect();
        if !self.template.contains("{}") {
            argv.push(path);
        }
        argv
    }
}

impl BackgroundSetter for CommandTemplate {
    fn apply(&self, path: &Path) -> Result<()> {
        let argv = self.argv(path);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| WallError::Background("empty background command".into()))?;
        run(Command::new(program).args(args), program)
    }
}

/// Only report the path; for setups where something else applies it
pub struct PrintOnly;

impl BackgroundSetter for PrintOnly {
    fn apply(&self, path: &Path) -> Result<()> {
        println!("{}", path.display());
        Ok(())
    }
}

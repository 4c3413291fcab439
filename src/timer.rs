//! Periodic rotation through a systemd user timer.

use crate::error::{Result, WallError};
use crate::utils::{expand_tilde, parse_interval};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const UNIT_NAME: &str = "stalenwall";

/// Where systemd looks for user units
pub fn unit_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| expand_tilde(Path::new("~/.config")))
        .join("systemd/user")
}

pub struct Timer {
    unit_dir: PathBuf,
    exe_path: PathBuf,
    /// Cache directory passed as `--dir` to every run
    images_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Active,
    Inactive,
    NotInstalled,
}

impl Timer {
    pub fn new(unit_dir: PathBuf, exe_path: PathBuf) -> Self {
        Self {
            unit_dir,
            exe_path,
            images_dir: None,
        }
    }

    pub fn with_images_dir(mut self, dir: PathBuf) -> Self {
        self.images_dir = Some(dir);
        self
    }

    /// Timer driving the currently running executable
    pub fn for_current_exe() -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| WallError::Timer(format!("cannot locate executable: {}", e)))?;
        Ok(Self::new(unit_dir(), exe))
    }

    fn service_path(&self) -> PathBuf {
        self.unit_dir.join(format!("{}.service", UNIT_NAME))
    }

    fn timer_path(&self) -> PathBuf {
        self.unit_dir.join(format!("{}.timer", UNIT_NAME))
    }

    fn service_unit(&self) -> String {
        let dir_arg = match &self.images_dir {
            Some(dir) => format!(" --dir \"{}\"", dir.display()),
            None => String::new(),
        };
        format!(
            "[Unit]\n\
             Description=Rotate desktop background (stalenwall)\n\
             After=graphical-session.target\n\n\
             [Service]\n\
             Type=oneshot\n\
             ExecStart=\"{}\"{} random\n",
            self.exe_path.display(),
            dir_arg
        )
    }

    fn timer_unit(interval: &str) -> String {
        format!(
            "[Unit]\n\
             Description=Rotate desktop background every {interval}\n\n\
             [Timer]\n\
             OnActiveSec=10s\n\
             OnUnitActiveSec={interval}\n\n\
             [Install]\n\
             WantedBy=timers.target\n"
        )
    }

    /// Write the units and start the timer
    pub fn enable(&self, interval: &str) -> Result<()> {
        if parse_interval(interval).is_none() {
            return Err(WallError::Timer(format!(
                "invalid interval \"{}\" (use e.g. 90s, 30m, 1h, 2d)",
                interval
            )));
        }

        self.write_units(interval)?;
        systemctl(&["daemon-reload"])?;
        systemctl(&["enable", "--now", &format!("{}.timer", UNIT_NAME)])?;
        tracing::info!("Enabled {}.timer every {}", UNIT_NAME, interval);
        Ok(())
    }

    fn write_units(&self, interval: &str) -> Result<()> {
        fs::create_dir_all(&self.unit_dir).map_err(|e| WallError::io(&self.unit_dir, e))?;

        let service = self.service_path();
        fs::write(&service, self.service_unit()).map_err(|e| WallError::io(&service, e))?;
        let timer = self.timer_path();
        fs::write(&timer, Self::timer_unit(interval)).map_err(|e| WallError::io(&timer, e))?;
        Ok(())
    }

    /// Stop the timer and remove the units
    pub fn disable(&self) -> Result<()> {
        if self.timer_path().exists() {
            systemctl(&["disable", "--now", &format!("{}.timer", UNIT_NAME)])?;
        }

        for path in [self.timer_path(), self.service_path()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(WallError::io(&path, e)),
            }
        }

        systemctl(&["daemon-reload"])?;
        tracing::info!("Disabled {}.timer", UNIT_NAME);
        Ok(())
    }

    pub fn status(&self) -> TimerStatus {
        if !self.timer_path().exists() {
            return TimerStatus::NotInstalled;
        }

        let active = Command::new("systemctl")
            .args(["--user", "is-active", "--quiet", &format!("{}.timer", UNIT_NAME)])
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        if active {
            TimerStatus::Active
        } else {
            TimerStatus::Inactive
        }
    }
}

fn systemctl(args: &[&str]) -> Result<()> {
    let output = Command::new("systemctl")
        .arg("--user")
        .args(args)
        .output()
        .map_err(|e| WallError::Timer(format!("failed to run systemctl: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(WallError::Timer(format!(
            "systemctl --user {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(())
}

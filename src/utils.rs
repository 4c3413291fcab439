use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extension of every image the gallery serves
pub const IMAGE_EXTENSION: &str = "jpg";

/// Check if a path is a cached gallery image
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(IMAGE_EXTENSION))
        .unwrap_or(false)
}

/// Expand tilde (~) in path
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

/// Parse an interval like "90s", "30m", "1h" or "2d"
pub fn parse_interval(s: &str) -> Option<Duration> {
    let s = s.trim();
    let unit_at = s.find(|c: char| !c.is_ascii_digit())?;
    let (value, unit) = s.split_at(unit_at);
    let value: u64 = value.parse().ok()?;
    if value == 0 {
        return None;
    }

    let secs = match unit {
        "s" => value,
        "m" => value * 60,
        "h" => value * 60 * 60,
        "d" => value * 60 * 60 * 24,
        _ => return None,
    };

    Some(Duration::from_secs(secs))
}

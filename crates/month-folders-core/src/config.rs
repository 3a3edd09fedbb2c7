use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::metadata::TimestampPolicy;

/// Folder inside the photos root that the phone sync drops new media into.
pub const CAMERA_ROLL_DIR: &str = "Camera Roll";

/// Used when neither `OneDrive` nor `ONEDRIVE` is set.
pub const FALLBACK_PHOTOS_ROOT: &str = "/OneDrive/Pictures";

pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "mkv", "mp4", "mpg", "mpeg", "mov", "png", "avi", "gif",
];

pub const DEFAULT_VENDOR_PREFIXES: &[&str] = &["Snapchat-"];

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_vendor_prefixes() -> Vec<String> {
    DEFAULT_VENDOR_PREFIXES.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_scan_dir() -> PathBuf {
    Path::new(FALLBACK_PHOTOS_ROOT).join(CAMERA_ROLL_DIR)
}

fn default_target_root() -> PathBuf {
    PathBuf::from(FALLBACK_PHOTOS_ROOT)
}

/// Everything the organizer needs, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerConfig {
    #[serde(default = "default_scan_dir")]
    pub scan_dir: PathBuf,
    #[serde(default = "default_target_root")]
    pub target_root: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_vendor_prefixes")]
    pub vendor_prefixes: Vec<String>,
    /// When false, names no rule matches are reported unresolved.
    #[serde(default = "default_true")]
    pub metadata_fallback: bool,
    #[serde(default)]
    pub timestamp_policy: TimestampPolicy,
    /// Ask `mediainfo` for embedded dates before falling back to timestamps.
    #[serde(default)]
    pub mediainfo: bool,
    /// Run every check but leave files where they are.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self::for_photos_root(FALLBACK_PHOTOS_ROOT)
    }
}

impl OrganizerConfig {
    /// Scan `<root>/Camera Roll`, file into `<root>/<YYYY>/<YYYY-MM>`.
    pub fn for_photos_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            scan_dir: root.join(CAMERA_ROLL_DIR),
            target_root: root.to_path_buf(),
            extensions: default_extensions(),
            vendor_prefixes: default_vendor_prefixes(),
            metadata_fallback: true,
            timestamp_policy: TimestampPolicy::default(),
            mediainfo: false,
            dry_run: false,
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }
}

/// Photos root derived from the environment: `$OneDrive/Pictures`,
/// `$ONEDRIVE/Pictures`, or `/OneDrive/Pictures`.
pub fn photos_root_from_env<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    ["OneDrive", "ONEDRIVE"]
        .iter()
        .find_map(|key| lookup(*key).filter(|v| !v.is_empty()))
        .map(|dir| PathBuf::from(dir).join("Pictures"))
        .unwrap_or_else(default_target_root)
}

/// Polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    /// The sleep is split into this many slices for progress display.
    pub ticks: u32,
    /// Stop after a single cycle.
    pub once: bool,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            ticks: 60,
            once: false,
        }
    }
}

impl Schedule {
    pub fn tick_length(&self) -> Duration {
        self.interval / self.ticks.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_photos_root_from_env() {
        let env: HashMap<&str, &str> = [("ONEDRIVE", "/mnt/c/Users/kim/OneDrive")].into();
        let root = photos_root_from_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(root, PathBuf::from("/mnt/c/Users/kim/OneDrive/Pictures"));

        let env: HashMap<&str, &str> = [("OneDrive", "/a"), ("ONEDRIVE", "/b")].into();
        let root = photos_root_from_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(root, PathBuf::from("/a/Pictures"));

        assert_eq!(photos_root_from_env(|_| None), PathBuf::from("/OneDrive/Pictures"));
    }

    #[test]
    fn test_for_photos_root() {
        let config = OrganizerConfig::for_photos_root("/photos");
        assert_eq!(config.scan_dir, PathBuf::from("/photos/Camera Roll"));
        assert_eq!(config.target_root, PathBuf::from("/photos"));
        assert!(config.metadata_fallback);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("month-folders.json");
        File::create(&path)
            .unwrap()
            .write_all(br#"{"scan_dir": "/in", "metadata_fallback": false, "timestamp_policy": "modified"}"#)
            .unwrap();

        let config = OrganizerConfig::load(&path).unwrap();
        assert_eq!(config.scan_dir, PathBuf::from("/in"));
        assert_eq!(config.target_root, PathBuf::from(FALLBACK_PHOTOS_ROOT));
        assert!(!config.metadata_fallback);
        assert_eq!(config.timestamp_policy, TimestampPolicy::Modified);
        assert_eq!(config.extensions.len(), DEFAULT_EXTENSIONS.len());
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempdir().unwrap();
        let err = OrganizerConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn test_tick_length() {
        let schedule = Schedule::default();
        assert_eq!(schedule.tick_length(), Duration::from_secs(15));
    }
}

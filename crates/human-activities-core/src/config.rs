use crate::error::Error;
use crate::named_dirs::{NamedDirs, MAX_NAMED_DIRS};
use crate::platform;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufReader};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_INTERVAL_SEC: u64 = 6 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "named")]
    NamedDirs,
    #[serde(rename = "path")]
    RootPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    SizeBytes,
    NumFiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interval_sec: u64,
    pub mode: Mode,
    pub root_path: Option<String>,
    pub named_dirs: NamedDirs,
    pub unit: Unit,
    pub threshold_days_ago: u32,
    pub show_setup: bool,
    pub test: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_sec: DEFAULT_INTERVAL_SEC,
            mode: Mode::NamedDirs,
            root_path: None,
            named_dirs: NamedDirs::new(),
            unit: Unit::SizeBytes,
            threshold_days_ago: 0,
            show_setup: true,
            test: false,
        }
    }
}

/// One directory the scan engine measures, with the label shown for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path: String,
    pub label: String,
}

impl Config {
    /// Reads the JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Config, Error> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                return Ok(Config::default());
            }
            Err(err) => return Err(err.into()),
        };
        let config: Config = serde_json::from_reader(BufReader::new(file))?;
        if config.named_dirs.truncated() {
            warn!(
                "Config lists more than {} named directories, extra ones were dropped",
                MAX_NAMED_DIRS
            );
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        debug!("Config written to {}", path.display());
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_sec)
    }

    /// Ordered, deduplicated list of directories to scan for the active mode.
    pub fn targets(&self) -> Result<Vec<Target>, Error> {
        match self.mode {
            Mode::NamedDirs => Ok(self
                .named_dirs
                .to_map()
                .into_iter()
                .map(|(path, label)| Target { path, label })
                .collect()),
            Mode::RootPath => {
                let root = self.root_path.as_deref().ok_or_else(|| {
                    Error::InvalidConfig("mode \"path\" requires root_path".to_string())
                })?;
                list_subdirectories(Path::new(root))
            }
        }
    }
}

/// Non-hidden immediate subdirectories of `root`, sorted by name and capped
/// like the named directory list. An unreadable root yields no targets.
pub fn list_subdirectories(root: &Path) -> Result<Vec<Target>, Error> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Cannot list root path {}: {}", root.display(), err);
            return Ok(Vec::new());
        }
    };

    let mut targets: Vec<Target> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            let metadata = fs::symlink_metadata(&path).ok()?;
            if !metadata.is_dir() || platform::is_hidden(&path, &metadata) {
                return None;
            }
            let label = entry.file_name().to_string_lossy().into_owned();
            Some(Target {
                path: path.to_string_lossy().into_owned(),
                label,
            })
        })
        .collect();

    targets.sort_by(|a, b| a.label.cmp(&b.label));
    targets.truncate(MAX_NAMED_DIRS);
    Ok(targets)
}

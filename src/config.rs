use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::gametime::extrapolate::DEFAULT_TICKS_CAP;

const HOME_ENV: &str = "DAYWATCH_HOME";
const DEBUG_ENV: &str = "DAYWATCH_DEBUG";
const CONFIG_FILE: &str = "daywatch.json";

/// Application-wide knobs, read once at start-up and handed to each component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub poll_interval_ms: u64,
    pub tick_interval_ms: u64,
    /// SQLite busy timeout; a locked save database skips the iteration after this.
    pub db_busy_timeout_ms: u64,
    pub ticks_cap: u32,
    pub console_lines: usize,
    /// Create lookup indexes in the save database on connect.
    pub ensure_indexes: bool,
    pub db_path: Option<PathBuf>,
    pub server_settings_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            tick_interval_ms: 1000,
            db_busy_timeout_ms: 1000,
            ticks_cap: DEFAULT_TICKS_CAP,
            console_lines: 64,
            ensure_indexes: false,
            db_path: None,
            server_settings_path: None,
        }
    }
}

impl AppConfig {
    /// Loads `config/daywatch.json`, writing the defaults there first if the
    /// file does not exist. A malformed file falls back to defaults.
    pub fn load(paths: &AppPaths) -> Result<Self> {
        let path = paths.config_file(CONFIG_FILE);
        let config = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed {}: {err}", path.display());
                Self::default()
            })
        } else {
            let defaults = Self::default();
            let serialized = serde_json::to_string_pretty(&defaults)?;
            fs::write(&path, serialized)
                .with_context(|| format!("Failed to write config to {}", path.display()))?;
            defaults
        };

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn db_busy_timeout(&self) -> Duration {
        Duration::from_millis(self.db_busy_timeout_ms)
    }
}

pub fn debug_from_env() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Directory layout under the tool root: `config/` for settings, `data/` for
/// the state file and the log.
#[derive(Debug, Clone)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// Uses `DAYWATCH_HOME` when set, otherwise the platform data directory.
    pub fn from_env() -> Result<Self> {
        let root = match std::env::var_os(HOME_ENV) {
            Some(root) => PathBuf::from(root),
            None => dirs::data_dir()
                .ok_or_else(|| anyhow!("Could not determine data directory"))?
                .join("daywatch"),
        };
        Self::new(root)
    }

    pub fn new(root: PathBuf) -> Result<Self> {
        for dir in [root.join("config"), root.join("data")] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self, name: &str) -> PathBuf {
        self.root.join("config").join(name)
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.root.join("data").join(name)
    }

    pub fn path_ini(&self) -> PathBuf {
        self.config_file("path.ini")
    }

    pub fn state_file(&self) -> PathBuf {
        self.data_file("data.ini")
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_file("log.txt")
    }
}

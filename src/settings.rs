use anyhow::{Context, Result};
use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameClockSettings {
    pub font_family: String,
    pub font_size: u32,
    pub font_color: String,
    /// Maximum number of seconds to extrapolate after each update. Falls back
    /// to the application-wide `ticks_cap` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulate_seconds: Option<u32>,
}

impl Default for GameClockSettings {
    fn default() -> Self {
        Self {
            font_family: "Arial".into(),
            font_size: 32,
            font_color: "#ff8000".into(),
            simulate_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CountDirection {
    #[default]
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StopwatchSettings {
    pub font_family: String,
    pub font_size: u32,
    pub font_color: String,
    /// Remaining-percentage threshold (as a string key) to colour.
    pub countdown_colors: BTreeMap<String, String>,
    pub show_seconds: bool,
    pub direction: CountDirection,
    pub start_time_sec: i64,
    /// Action name to key combo.
    pub shortcuts: BTreeMap<String, String>,
}

impl Default for StopwatchSettings {
    fn default() -> Self {
        let countdown_colors = [
            ("100", "#4080cc"),
            ("75", "#00ff00"),
            ("50", "#ffff00"),
            ("25", "#ff8000"),
            ("20", "#ff6000"),
            ("15", "#ff4000"),
            ("10", "#ff2000"),
            ("5", "#ff1000"),
            ("0", "#ff0000"),
        ];
        let shortcuts = [
            ("start", "ctrl+s"),
            ("reset", "ctrl+r"),
            ("add_min", "ctrl+up"),
            ("add_10min", "ctrl+shift+up"),
            ("add_hour", "ctrl+right"),
            ("sub_min", "ctrl+down"),
            ("sub_10min", "ctrl+shift+down"),
            ("sub_hour", "ctrl+left"),
            ("direction_toggle", "ctrl+d"),
        ];

        Self {
            font_family: "Arial".into(),
            font_size: 28,
            font_color: "#00ffcc".into(),
            countdown_colors: to_map(&countdown_colors),
            show_seconds: true,
            direction: CountDirection::Up,
            start_time_sec: 0,
            shortcuts: to_map(&shortcuts),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SystemClockSettings {
    pub font_family: String,
    pub font_size: u32,
    pub font_color: String,
    pub show_seconds: bool,
    pub show_date: bool,
    /// Qt-style pattern, e.g. `dd.MM.yyyy`.
    pub date_format: String,
}

impl Default for SystemClockSettings {
    fn default() -> Self {
        Self {
            font_family: "Arial".into(),
            font_size: 28,
            font_color: "#00ffcc".into(),
            show_seconds: true,
            show_date: false,
            date_format: "dd.MM.yyyy".into(),
        }
    }
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// A JSON settings file owned by one widget. Created with defaults when
/// missing and re-read whenever its modification time changes. Missing fields
/// take their defaults; a file that fails to parse yields all defaults.
pub struct SettingsStore<T> {
    path: PathBuf,
    data: T,
    last_mtime: Option<SystemTime>,
}

impl<T> SettingsStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory {}", parent.display())
                })?;
            }
            persist(&path, &T::default())?;
        }

        let mut store = Self {
            path,
            data: T::default(),
            last_mtime: None,
        };
        store.refresh();
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> &T {
        &self.data
    }

    /// Reloads the file if it changed on disk. Returns `true` on reload.
    pub fn refresh(&mut self) -> bool {
        let mtime = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok();
        if mtime.is_some() && mtime == self.last_mtime {
            return false;
        }
        self.last_mtime = mtime;

        self.data = match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed {}: {err}", self.path.display());
                T::default()
            }),
            Err(_) => T::default(),
        };
        true
    }

    pub fn update(&mut self, data: T) -> Result<()> {
        persist(&self.path, &data)?;
        self.last_mtime = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok();
        self.data = data;
        Ok(())
    }
}

fn persist<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(data)?;
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write settings to {}", path.display()))
}

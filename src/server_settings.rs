use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{anyhow, Context, Result};
use ini::Ini;
use log::warn;

const WORLD_SECTION: &str = "World";
const TIME_SPEED_KEY: &str = "scum.TimeOfDaySpeed";

/// Reads `[World] scum.TimeOfDaySpeed` from a server settings file.
///
/// `Ok(None)` when the section or key is absent. Keys match case-insensitively.
pub fn read_time_of_day_speed(path: &Path) -> Result<Option<f64>> {
    let ini = Ini::load_from_file_noescape(path)
        .with_context(|| format!("failed to read server settings {}", path.display()))?;

    let Some(world) = ini
        .iter()
        .find(|(name, _)| name.is_some_and(|name| name.eq_ignore_ascii_case(WORLD_SECTION)))
        .map(|(_, props)| props)
    else {
        return Ok(None);
    };

    let Some((_, raw)) = world
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(TIME_SPEED_KEY))
    else {
        return Ok(None);
    };

    raw.trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|err| anyhow!("invalid {TIME_SPEED_KEY} '{raw}': {err}"))
}

/// Day-length multiplier source for the poller. Re-parses the settings file
/// only when its modification time changes.
#[derive(Debug)]
pub struct TimeSpeedSource {
    path: Option<PathBuf>,
    last_mtime: Option<SystemTime>,
    cached: Option<f64>,
}

impl TimeSpeedSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            last_mtime: None,
            cached: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current multiplier, or `None` when it cannot be determined.
    pub fn current(&mut self) -> Option<f64> {
        let path = self.path.as_ref()?;

        let mtime = match fs::metadata(path).and_then(|meta| meta.modified()) {
            Ok(mtime) => mtime,
            Err(err) => {
                if self.last_mtime.is_some() {
                    warn!("Server settings {} unavailable: {err}", path.display());
                }
                self.last_mtime = None;
                self.cached = None;
                return None;
            }
        };

        if self.last_mtime != Some(mtime) {
            self.last_mtime = Some(mtime);
            self.cached = match read_time_of_day_speed(path) {
                Ok(Some(speed)) if speed > 0.0 => Some(speed),
                Ok(Some(speed)) => {
                    warn!("Ignoring non-positive {TIME_SPEED_KEY} {speed}");
                    None
                }
                Ok(None) => None,
                Err(err) => {
                    warn!("Failed to read {TIME_SPEED_KEY}: {err:#}");
                    None
                }
            };
        }

        self.cached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_multiplier_ignoring_case() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ServerSettings.ini");
        fs::write(
            &path,
            "[General]\nscum.ServerName=Test\n\n[world]\nscum.timeofdayspeed=3.5\n",
        )
        .unwrap();

        assert_eq!(read_time_of_day_speed(&path).unwrap(), Some(3.5));
    }

    #[test]
    fn missing_key_is_none_and_bad_value_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ServerSettings.ini");

        fs::write(&path, "[World]\nscum.NightTimeSpeed=2\n").unwrap();
        assert_eq!(read_time_of_day_speed(&path).unwrap(), None);

        fs::write(&path, "[World]\nscum.TimeOfDaySpeed=fast\n").unwrap();
        assert!(read_time_of_day_speed(&path).is_err());
    }

    #[test]
    fn source_without_path_yields_nothing() {
        let mut source = TimeSpeedSource::new(None);
        assert_eq!(source.current(), None);
    }

    #[test]
    fn source_reads_and_caches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ServerSettings.ini");
        fs::write(&path, "[World]\nscum.TimeOfDaySpeed=2.0\n").unwrap();

        let mut source = TimeSpeedSource::new(Some(path.clone()));
        assert_eq!(source.current(), Some(2.0));
        assert_eq!(source.current(), Some(2.0));

        fs::remove_file(&path).unwrap();
        assert_eq!(source.current(), None);
    }
}

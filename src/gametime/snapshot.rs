use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use ini::{EscapePolicy, Ini};
use log::{debug, warn};
use serde::Serialize;

use super::convert::{to_hour_minute, HourMinute};

pub const TIME_SECTION: &str = "Time";
pub const SIMULATION_SECTION: &str = "Time_Simulation";

const KEY_TIME_OF_DAY: &str = "time_of_day";
const KEY_HOURS: &str = "hours";
const KEY_MINUTES: &str = "minutes";
const KEY_TIME_SPEED: &str = "time_speed";
const KEY_SAMPLED_AT: &str = "sampled_at";
const KEY_SIMULATE_SECONDS: &str = "Second";

/// Written in place of `time_of_day` when no active player time is known.
pub const NO_TIME_SENTINEL: &str = "None";

/// One reading taken by the poller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTimeSample {
    pub time_of_day: Option<f64>,
    pub time_speed: Option<f64>,
    pub sampled_at: DateTime<Utc>,
}

impl RawTimeSample {
    pub fn new(time_of_day: Option<f64>, time_speed: Option<f64>) -> Self {
        Self {
            time_of_day,
            time_speed,
            sampled_at: Utc::now(),
        }
    }

    pub fn clock(&self) -> HourMinute {
        self.time_of_day.map(to_hour_minute).unwrap_or_default()
    }
}

/// Typed view of the state file as the widgets see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSnapshot {
    /// `None` when the poller wrote the no-time sentinel.
    pub time_of_day: Option<f64>,
    pub clock: HourMinute,
    pub time_speed: Option<f64>,
    /// Optional `[Time_Simulation] Second` override of the extrapolation cap.
    pub simulate_seconds: Option<u32>,
    /// When the poller took the sample, if the file records it.
    pub sampled_at: Option<DateTime<Utc>>,
}

/// Rewrites the `[Time]` keys of the state file, keeping every other section
/// and key that is already there.
pub fn write_sample(path: &Path, sample: &RawTimeSample) -> Result<()> {
    let mut ini = if path.exists() {
        match Ini::load_from_file_noescape(path) {
            Ok(existing) => existing,
            Err(err) => {
                warn!(
                    "State file {} is unreadable, rewriting it: {err}",
                    path.display()
                );
                Ini::new()
            }
        }
    } else {
        Ini::new()
    };

    let clock = sample.clock();
    let time_value = sample
        .time_of_day
        .map(|t| t.to_string())
        .unwrap_or_else(|| NO_TIME_SENTINEL.to_string());

    ini.with_section(Some(TIME_SECTION))
        .set(KEY_TIME_OF_DAY, time_value)
        .set(KEY_HOURS, clock.hours.to_string())
        .set(KEY_MINUTES, clock.minutes.to_string())
        .set(KEY_SAMPLED_AT, sample.sampled_at.to_rfc3339());

    // Leave the last known multiplier in place when the server settings
    // could not be read this round.
    if let Some(speed) = sample.time_speed {
        ini.with_section(Some(TIME_SECTION))
            .set(KEY_TIME_SPEED, speed.to_string());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create state directory {}", parent.display()))?;
    }

    // Loaded without unescaping, so written back without escaping; foreign
    // values such as Windows paths must survive every rewrite unchanged.
    ini.write_to_file_policy(path, EscapePolicy::Nothing)
        .with_context(|| format!("failed to write state file {}", path.display()))
}

/// Parses the state file. `Ok(None)` means the file has no `[Time]` section.
pub fn read_snapshot(path: &Path) -> Result<Option<TimeSnapshot>> {
    let ini = Ini::load_from_file_noescape(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    parse_snapshot(&ini)
}

fn parse_snapshot(ini: &Ini) -> Result<Option<TimeSnapshot>> {
    let Some(section) = ini.section(Some(TIME_SECTION)) else {
        return Ok(None);
    };

    let raw_time = section
        .get(KEY_TIME_OF_DAY)
        .unwrap_or(NO_TIME_SENTINEL)
        .trim();
    let time_of_day = if raw_time.eq_ignore_ascii_case(NO_TIME_SENTINEL) {
        None
    } else {
        Some(parse_f64(raw_time, KEY_TIME_OF_DAY)?)
    };

    let time_speed = section
        .get(KEY_TIME_SPEED)
        .map(|raw| parse_f64(raw.trim(), KEY_TIME_SPEED))
        .transpose()?;
    if let Some(speed) = time_speed {
        if speed <= 0.0 {
            return Err(anyhow!("invalid {KEY_TIME_SPEED} '{speed}': must be positive"));
        }
    }

    let clock = HourMinute {
        hours: parse_or_zero(section.get(KEY_HOURS)),
        minutes: parse_or_zero(section.get(KEY_MINUTES)),
    };

    let simulate_seconds = find_ignore_case(ini, SIMULATION_SECTION, KEY_SIMULATE_SECONDS)
        .and_then(|raw| raw.trim().parse::<u32>().ok());

    let sampled_at = section
        .get(KEY_SAMPLED_AT)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|at| at.with_timezone(&Utc));

    Ok(Some(TimeSnapshot {
        time_of_day,
        clock,
        time_speed,
        simulate_seconds,
        sampled_at,
    }))
}

/// `nan` and `inf` parse as floats but are never a usable reading.
fn parse_f64(raw: &str, field: &str) -> Result<f64> {
    let value = raw
        .parse::<f64>()
        .map_err(|err| anyhow!("invalid {field} '{raw}': {err}"))?;
    if !value.is_finite() {
        return Err(anyhow!("invalid {field} '{raw}': not a finite number"));
    }
    Ok(value)
}

/// Section and key lookup that ignores case, for hand-edited entries.
fn find_ignore_case<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.iter()
        .filter(|(name, _)| name.is_some_and(|name| name.eq_ignore_ascii_case(section)))
        .flat_map(|(_, props)| props.iter())
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
}

fn parse_or_zero(raw: Option<&str>) -> u8 {
    raw.and_then(|value| value.trim().parse().ok()).unwrap_or(0)
}

/// Re-reads the state file only when its modification time moves.
#[derive(Debug)]
pub struct StateFileReader {
    path: PathBuf,
    last_mtime: Option<SystemTime>,
}

impl StateFileReader {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_mtime: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a snapshot when the file changed since the last call (or
    /// unconditionally with `force`). Missing, unchanged, or unparsable files
    /// all read as "no update".
    pub fn poll(&mut self, force: bool) -> Option<TimeSnapshot> {
        let mtime = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()?;

        if !force && self.last_mtime == Some(mtime) {
            return None;
        }
        self.last_mtime = Some(mtime);

        match read_snapshot(&self.path) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                debug!("Ignoring state file update: {err:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_keeps_foreign_sections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.ini");
        fs::write(
            &path,
            "[Weather]\nrain = 0.4\n\n[Time_Simulation]\nSecond = 45\n",
        )
        .unwrap();

        write_sample(&path, &RawTimeSample::new(Some(13.5), Some(2.0))).unwrap();

        let snapshot = read_snapshot(&path).unwrap().unwrap();
        assert_eq!(snapshot.time_of_day, Some(13.5));
        assert_eq!(snapshot.clock.hours, 13);
        assert_eq!(snapshot.clock.minutes, 30);
        assert_eq!(snapshot.time_speed, Some(2.0));
        assert_eq!(snapshot.simulate_seconds, Some(45));

        let ini = Ini::load_from_file(&path).unwrap();
        assert_eq!(ini.get_from(Some("Weather"), "rain"), Some("0.4"));
    }

    #[test]
    fn missing_time_writes_sentinel_and_keeps_previous_speed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.ini");

        write_sample(&path, &RawTimeSample::new(Some(6.25), Some(3.0))).unwrap();
        write_sample(&path, &RawTimeSample::new(None, None)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("time_of_day=None"));

        let snapshot = read_snapshot(&path).unwrap().unwrap();
        assert_eq!(snapshot.time_of_day, None);
        assert_eq!(snapshot.clock, HourMinute::default());
        assert_eq!(snapshot.time_speed, Some(3.0));
    }

    #[test]
    fn sentinel_is_case_insensitive() {
        let ini = Ini::load_from_str("[Time]\ntime_of_day = none\n").unwrap();
        let snapshot = parse_snapshot(&ini).unwrap().unwrap();
        assert_eq!(snapshot.time_of_day, None);
        assert_eq!(snapshot.time_speed, None);
    }

    #[test]
    fn garbage_time_is_an_error() {
        let ini = Ini::load_from_str("[Time]\ntime_of_day = noon\n").unwrap();
        assert!(parse_snapshot(&ini).is_err());
    }

    #[test]
    fn reader_skips_unchanged_and_missing_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.ini");
        let mut reader = StateFileReader::new(path.clone());

        assert!(reader.poll(false).is_none());

        write_sample(&path, &RawTimeSample::new(Some(1.0), Some(1.0))).unwrap();
        assert!(reader.poll(false).is_some());
        assert!(reader.poll(false).is_none());
        assert!(reader.poll(true).is_some());
    }

    #[test]
    fn windows_paths_survive_repeated_rewrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.ini");
        fs::write(&path, "[Paths]\nsave = C:\\Games\\SCUM\n").unwrap();

        for hour in 0..5 {
            write_sample(&path, &RawTimeSample::new(Some(hour as f64), Some(1.0))).unwrap();
        }

        let ini = Ini::load_from_file_noescape(&path).unwrap();
        assert_eq!(ini.get_from(Some("Paths"), "save"), Some(r"C:\Games\SCUM"));
        assert_eq!(read_snapshot(&path).unwrap().unwrap().time_of_day, Some(4.0));
    }

    #[test]
    fn non_finite_or_non_positive_values_are_errors() {
        for body in [
            "[Time]\ntime_of_day = nan\n",
            "[Time]\ntime_of_day = inf\n",
            "[Time]\ntime_of_day = 10.0\ntime_speed = NaN\n",
            "[Time]\ntime_of_day = 10.0\ntime_speed = 0\n",
            "[Time]\ntime_of_day = 10.0\ntime_speed = -2\n",
        ] {
            let ini = Ini::load_from_str(body).unwrap();
            assert!(parse_snapshot(&ini).is_err(), "accepted {body:?}");
        }
    }

    #[test]
    fn simulation_override_key_ignores_case() {
        let ini = Ini::load_from_str("[Time]\ntime_of_day = 1.0\n\n[time_simulation]\nsecond = 90\n")
            .unwrap();
        let snapshot = parse_snapshot(&ini).unwrap().unwrap();
        assert_eq!(snapshot.simulate_seconds, Some(90));
    }

    #[test]
    fn sample_time_is_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.ini");
        let sample = RawTimeSample::new(Some(8.0), Some(1.0));
        write_sample(&path, &sample).unwrap();

        let snapshot = read_snapshot(&path).unwrap().unwrap();
        assert_eq!(snapshot.sampled_at, Some(sample.sampled_at));
    }

    #[test]
    fn reader_treats_unparsable_file_as_no_update() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.ini");
        fs::write(&path, "[Time]\ntime_of_day = ???\n").unwrap();

        let mut reader = StateFileReader::new(path);
        assert!(reader.poll(true).is_none());
    }
}

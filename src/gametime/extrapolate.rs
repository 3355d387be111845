use serde::Serialize;

use super::snapshot::TimeSnapshot;

pub const DEFAULT_TICKS_CAP: u32 = 120;

/// Minimum change in time or speed that counts as a fresh sample.
const SAMPLE_EPSILON: f64 = 0.001;
const SECONDS_PER_HOUR: f64 = 3600.0;
const HOURS_PER_DAY: f64 = 24.0;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ExtrapolationMode {
    Disabled,
    Tracking,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtrapolationState {
    pub base_time: f64,
    pub base_speed: f64,
    pub elapsed_ticks: u32,
    pub ticks_cap: u32,
}

/// In-game wall time split for display.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DisplayedTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl DisplayedTime {
    pub fn from_day_hours(time_of_day: f64) -> Self {
        let day_seconds = (HOURS_PER_DAY * SECONDS_PER_HOUR) as u64;
        let total = (time_of_day.rem_euclid(HOURS_PER_DAY) * SECONDS_PER_HOUR).round() as u64
            % day_seconds;
        Self {
            hours: (total / 3600) as u8,
            minutes: ((total % 3600) / 60) as u8,
            seconds: (total % 60) as u8,
        }
    }

    pub fn hms(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Keeps a game clock ticking smoothly between samples by advancing the last
/// known time at the last known speed, for at most `ticks_cap` ticks.
#[derive(Debug, Clone)]
pub struct Extrapolator {
    mode: ExtrapolationMode,
    state: ExtrapolationState,
    last_loaded: Option<(f64, f64)>,
}

impl Extrapolator {
    pub fn new(ticks_cap: u32) -> Self {
        Self {
            mode: ExtrapolationMode::Disabled,
            state: ExtrapolationState {
                base_time: 0.0,
                base_speed: 1.0,
                elapsed_ticks: 0,
                ticks_cap,
            },
            last_loaded: None,
        }
    }

    pub fn mode(&self) -> ExtrapolationMode {
        self.mode
    }

    pub fn state(&self) -> &ExtrapolationState {
        &self.state
    }

    /// Changes the ceiling; ticks already spent above it stay capped.
    pub fn set_ticks_cap(&mut self, ticks_cap: u32) {
        self.state.ticks_cap = ticks_cap;
        self.state.elapsed_ticks = self.state.elapsed_ticks.min(ticks_cap);
    }

    /// Feeds a freshly read state file. Returns `true` when the sample
    /// replaced the base time.
    pub fn observe(&mut self, snapshot: &TimeSnapshot) -> bool {
        if let Some(cap) = snapshot.simulate_seconds {
            self.set_ticks_cap(cap);
        }

        let Some(time_of_day) = snapshot.time_of_day else {
            self.mode = ExtrapolationMode::Disabled;
            return false;
        };
        let time_speed = snapshot.time_speed.unwrap_or(1.0);
        if !time_of_day.is_finite() || !time_speed.is_finite() || time_speed <= 0.0 {
            return false;
        }

        let fresh = match self.last_loaded {
            None => true,
            Some((last_time, last_speed)) => {
                (time_of_day - last_time).abs() > SAMPLE_EPSILON
                    || (time_speed - last_speed).abs() > SAMPLE_EPSILON
            }
        };

        self.last_loaded = Some((time_of_day, time_speed));
        self.mode = ExtrapolationMode::Tracking;

        if fresh {
            self.state.base_time = time_of_day.rem_euclid(HOURS_PER_DAY);
            self.state.base_speed = time_speed;
            self.state.elapsed_ticks = 0;
        }

        fresh
    }

    /// Advances one second of real time. Returns the time to show, or `None`
    /// while disabled.
    pub fn tick(&mut self) -> Option<DisplayedTime> {
        if self.mode == ExtrapolationMode::Disabled {
            return None;
        }

        if self.state.elapsed_ticks < self.state.ticks_cap {
            self.state.base_time = (self.state.base_time
                + self.state.base_speed / SECONDS_PER_HOUR)
                .rem_euclid(HOURS_PER_DAY);
            self.state.elapsed_ticks += 1;
        }

        self.displayed()
    }

    pub fn displayed(&self) -> Option<DisplayedTime> {
        match self.mode {
            ExtrapolationMode::Disabled => None,
            ExtrapolationMode::Tracking => Some(DisplayedTime::from_day_hours(self.state.base_time)),
        }
    }
}

impl Default for Extrapolator {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_CAP)
    }
}

use std::{collections::HashMap, path::PathBuf};

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;

use crate::settings::{CountDirection, SettingsStore, StopwatchSettings};

use super::TextStyle;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StopwatchAction {
    Start,
    Reset,
    AddMin,
    Add10Min,
    AddHour,
    SubMin,
    Sub10Min,
    SubHour,
    DirectionToggle,
}

impl StopwatchAction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "reset" => Some(Self::Reset),
            "add_min" => Some(Self::AddMin),
            "add_10min" => Some(Self::Add10Min),
            "add_hour" => Some(Self::AddHour),
            "sub_min" => Some(Self::SubMin),
            "sub_10min" => Some(Self::Sub10Min),
            "sub_hour" => Some(Self::SubHour),
            "direction_toggle" => Some(Self::DirectionToggle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Reset => "reset",
            Self::AddMin => "add_min",
            Self::Add10Min => "add_10min",
            Self::AddHour => "add_hour",
            Self::SubMin => "sub_min",
            Self::Sub10Min => "sub_10min",
            Self::SubHour => "sub_hour",
            Self::DirectionToggle => "direction_toggle",
        }
    }
}

/// Lower-case with whitespace removed, so `Ctrl + Shift + Up` matches
/// `ctrl+shift+up`.
pub fn normalize_combo(combo: &str) -> String {
    combo
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopwatchState {
    pub running: bool,
    pub direction: CountDirection,
    pub current_secs: i64,
    pub start_secs: i64,
    /// Denominator for the remaining percentage while counting down.
    pub percent_base_secs: i64,
}

impl StopwatchState {
    pub fn new(direction: CountDirection, start_secs: i64) -> Self {
        Self {
            running: false,
            direction,
            current_secs: start_secs,
            start_secs,
            percent_base_secs: start_secs,
        }
    }

    pub fn apply(&mut self, action: StopwatchAction) {
        match action {
            StopwatchAction::Start => {
                self.running = !self.running;
                if self.running
                    && self.direction == CountDirection::Down
                    && self.percent_base_secs == 0
                {
                    self.percent_base_secs = self.current_secs.max(1);
                }
            }
            StopwatchAction::Reset => {
                self.current_secs = self.start_secs;
                self.running = false;
                self.percent_base_secs = self.current_secs;
            }
            StopwatchAction::AddMin => self.current_secs = self.current_secs.saturating_add(60),
            StopwatchAction::Add10Min => self.current_secs = self.current_secs.saturating_add(600),
            StopwatchAction::AddHour => self.current_secs = self.current_secs.saturating_add(3600),
            StopwatchAction::SubMin => self.current_secs = (self.current_secs - 60).max(0),
            StopwatchAction::Sub10Min => self.current_secs = (self.current_secs - 600).max(0),
            StopwatchAction::SubHour => self.current_secs = (self.current_secs - 3600).max(0),
            StopwatchAction::DirectionToggle => {
                self.direction = match self.direction {
                    CountDirection::Up => CountDirection::Down,
                    CountDirection::Down => CountDirection::Up,
                };
                self.percent_base_secs = match self.direction {
                    CountDirection::Down => self.current_secs.max(1),
                    CountDirection::Up => self.current_secs,
                };
            }
        }
    }

    /// One second of real time.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        match self.direction {
            CountDirection::Up => self.current_secs = self.current_secs.saturating_add(1),
            CountDirection::Down => {
                self.current_secs -= 1;
                if self.current_secs <= 0 {
                    self.current_secs = 0;
                    self.running = false;
                }
            }
        }
    }

    /// Remaining share of the countdown, `0..=100`. `None` when counting up.
    pub fn remaining_percent(&self) -> Option<i64> {
        if self.direction != CountDirection::Down || self.percent_base_secs <= 0 {
            return None;
        }
        let percent = 100 * i128::from(self.current_secs) / i128::from(self.percent_base_secs);
        Some(percent.clamp(0, 100) as i64)
    }
}

/// `HH:MM:SS` or `HH:MM`, with a leading `-` for negative values.
pub fn format_duration(secs: i64, show_seconds: bool) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if show_seconds {
        format!("{sign}{h:02}:{m:02}:{s:02}")
    } else {
        format!("{sign}{h:02}:{m:02}")
    }
}

/// Colour of the highest threshold not above `percent`.
pub fn percent_color(percent: i64, colors: &std::collections::BTreeMap<String, String>) -> String {
    let mut thresholds: Vec<(i64, &String)> = colors
        .iter()
        .filter_map(|(key, color)| key.trim().parse::<i64>().ok().map(|p| (p, color)))
        .collect();
    thresholds.sort_by(|a, b| b.0.cmp(&a.0));

    thresholds
        .into_iter()
        .find(|(threshold, _)| percent >= *threshold)
        .map(|(_, color)| color.clone())
        .or_else(|| colors.get("0").cloned())
        .unwrap_or_else(|| "#ff0000".to_string())
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StopwatchView {
    pub text: String,
    pub style: TextStyle,
    pub direction: CountDirection,
    pub running: bool,
}

/// Count-up stopwatch / countdown timer driven by shortcut combos.
pub struct StopwatchWidget {
    settings: SettingsStore<StopwatchSettings>,
    state: StopwatchState,
    bindings: HashMap<String, StopwatchAction>,
}

impl StopwatchWidget {
    pub fn new(settings_path: PathBuf) -> Result<Self> {
        let settings = SettingsStore::<StopwatchSettings>::new(settings_path)?;
        let mut widget = Self {
            state: StopwatchState::new(CountDirection::Up, 0),
            settings,
            bindings: HashMap::new(),
        };
        widget.apply_settings();
        Ok(widget)
    }

    pub fn state(&self) -> &StopwatchState {
        &self.state
    }

    /// Resets the count to the configured start and rebinds shortcuts.
    fn apply_settings(&mut self) {
        let settings = self.settings.get();
        self.state = StopwatchState::new(settings.direction, settings.start_time_sec);

        self.bindings.clear();
        for (name, combo) in &settings.shortcuts {
            match StopwatchAction::from_name(name) {
                Some(action) => {
                    self.bindings.insert(normalize_combo(combo), action);
                }
                None => warn!("Unknown stopwatch action '{name}' in {}", self.settings.path().display()),
            }
        }
    }

    /// Runs the action bound to `combo`, if any.
    pub fn handle_shortcut(&mut self, combo: &str) -> Option<StopwatchAction> {
        let action = *self.bindings.get(&normalize_combo(combo))?;
        self.state.apply(action);
        info!("Stopwatch {}", action.as_str());
        Some(action)
    }

    pub fn tick(&mut self) -> StopwatchView {
        if self.settings.refresh() {
            self.apply_settings();
        }
        self.state.tick();
        self.view()
    }

    pub fn view(&self) -> StopwatchView {
        let settings = self.settings.get();
        let color = match self.state.remaining_percent() {
            Some(percent) => percent_color(percent, &settings.countdown_colors),
            None => settings.font_color.clone(),
        };

        StopwatchView {
            text: format_duration(self.state.current_secs, settings.show_seconds),
            style: TextStyle::new(&settings.font_family, settings.font_size, &color),
            direction: self.state.direction,
            running: self.state.running,
        }
    }
}

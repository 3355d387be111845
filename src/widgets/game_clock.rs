use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::{
    gametime::{ExtrapolationMode, Extrapolator, StateFileReader},
    settings::{GameClockSettings, SettingsStore},
};

use super::TextStyle;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameClockView {
    /// `HH:MM:SS`, or empty while no in-game time is known.
    pub text: String,
    pub style: TextStyle,
    pub mode: ExtrapolationMode,
}

/// In-game clock that ticks smoothly between poller updates.
pub struct GameClockWidget {
    settings: SettingsStore<GameClockSettings>,
    reader: StateFileReader,
    clock: Extrapolator,
    default_cap: u32,
}

impl GameClockWidget {
    /// `default_cap` applies unless the widget settings set `simulate_seconds`.
    pub fn new(settings_path: PathBuf, state_file: PathBuf, default_cap: u32) -> Result<Self> {
        let settings = SettingsStore::<GameClockSettings>::new(settings_path)?;
        let mut clock = Extrapolator::new(settings.get().simulate_seconds.unwrap_or(default_cap));
        let mut reader = StateFileReader::new(state_file);

        if let Some(snapshot) = reader.poll(true) {
            clock.observe(&snapshot);
        }

        Ok(Self {
            settings,
            reader,
            clock,
            default_cap,
        })
    }

    pub fn extrapolator(&self) -> &Extrapolator {
        &self.clock
    }

    pub fn tick(&mut self) -> GameClockView {
        if self.settings.refresh() {
            let cap = self.settings.get().simulate_seconds.unwrap_or(self.default_cap);
            self.clock.set_ticks_cap(cap);
        }

        if let Some(snapshot) = self.reader.poll(false) {
            self.clock.observe(&snapshot);
        }

        let text = self
            .clock
            .tick()
            .map(|shown| shown.hms())
            .unwrap_or_default();

        let settings = self.settings.get();
        GameClockView {
            text,
            style: TextStyle::new(&settings.font_family, settings.font_size, &settings.font_color),
            mode: self.clock.mode(),
        }
    }
}

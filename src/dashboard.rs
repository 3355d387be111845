use std::fmt;

use anyhow::Result;
use serde::Serialize;

use crate::{
    config::{AppConfig, AppPaths},
    settings::CountDirection,
    widgets::{
        ClockWidget, ConsoleView, ConsoleWidget, GameClockView, GameClockWidget, StopwatchAction,
        StopwatchView, StopwatchWidget, SystemClockView, SystemClockWidget,
    },
};

/// Everything the widgets want shown after one tick.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardFrame {
    pub game_clock: GameClockView,
    pub clock: String,
    pub system_clock: SystemClockView,
    pub stopwatch: StopwatchView,
    pub console: ConsoleView,
}

impl fmt::Display for DashboardFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let game = if self.game_clock.text.is_empty() {
            "--:--:--"
        } else {
            self.game_clock.text.as_str()
        };
        let arrow = match self.stopwatch.direction {
            CountDirection::Up => "up",
            CountDirection::Down => "down",
        };

        write!(
            f,
            "game {game} | server {} | local {}",
            self.clock, self.system_clock.time
        )?;
        if let Some(date) = &self.system_clock.date {
            write!(f, " {date}")?;
        }
        write!(f, " | stopwatch {} ({arrow}", self.stopwatch.text)?;
        if !self.stopwatch.running {
            write!(f, ", paused")?;
        }
        write!(f, ")")
    }
}

pub struct Dashboard {
    game_clock: GameClockWidget,
    clock: ClockWidget,
    system_clock: SystemClockWidget,
    stopwatch: StopwatchWidget,
    console: ConsoleWidget,
}

impl Dashboard {
    pub fn new(config: &AppConfig, paths: &AppPaths) -> Result<Self> {
        let state_file = paths.state_file();

        Ok(Self {
            game_clock: GameClockWidget::new(
                paths.config_file("game_clock.json"),
                state_file.clone(),
                config.ticks_cap,
            )?,
            clock: ClockWidget::new(state_file),
            system_clock: SystemClockWidget::new(paths.config_file("system_clock.json"))?,
            stopwatch: StopwatchWidget::new(paths.config_file("stopwatch.json"))?,
            console: ConsoleWidget::new(paths.log_file(), config.console_lines),
        })
    }

    pub fn tick(&mut self) -> DashboardFrame {
        DashboardFrame {
            game_clock: self.game_clock.tick(),
            clock: self.clock.tick(),
            system_clock: self.system_clock.tick(),
            stopwatch: self.stopwatch.tick(),
            console: self.console.tick().clone(),
        }
    }

    pub fn dispatch_shortcut(&mut self, combo: &str) -> Option<StopwatchAction> {
        self.stopwatch.handle_shortcut(combo)
    }
}

//! Headless view models for the dashboard widgets. Each one is ticked once a
//! second and returns the text and style an external renderer should show.

use serde::Serialize;

pub mod clock;
pub mod console;
pub mod game_clock;
pub mod stopwatch;
pub mod system_clock;

pub use clock::ClockWidget;
pub use console::{ConsoleView, ConsoleWidget};
pub use game_clock::{GameClockView, GameClockWidget};
pub use stopwatch::{StopwatchAction, StopwatchView, StopwatchWidget};
pub use system_clock::{SystemClockView, SystemClockWidget};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: u32,
    pub color: String,
}

impl TextStyle {
    pub fn new(font_family: &str, font_size: u32, color: &str) -> Self {
        Self {
            font_family: font_family.to_string(),
            font_size,
            color: color.to_string(),
        }
    }
}

use std::path::PathBuf;

use crate::gametime::{HourMinute, StateFileReader};

/// Shows the poller's last persisted `hours:minutes` without extrapolating.
pub struct ClockWidget {
    reader: StateFileReader,
    current: HourMinute,
}

impl ClockWidget {
    pub fn new(state_file: PathBuf) -> Self {
        Self {
            reader: StateFileReader::new(state_file),
            current: HourMinute::default(),
        }
    }

    pub fn tick(&mut self) -> String {
        if let Some(snapshot) = self.reader.poll(false) {
            self.current = snapshot.clock;
        }
        format!("{:02}:{:02}", self.current.hours, self.current.minutes)
    }
}

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::settings::{SettingsStore, SystemClockSettings};

use super::TextStyle;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemClockView {
    pub time: String,
    /// Present only when `show_date` is on.
    pub date: Option<String>,
    pub style: TextStyle,
}

/// Local wall-clock time.
pub struct SystemClockWidget {
    settings: SettingsStore<SystemClockSettings>,
}

impl SystemClockWidget {
    pub fn new(settings_path: PathBuf) -> Result<Self> {
        Ok(Self {
            settings: SettingsStore::new(settings_path)?,
        })
    }

    pub fn tick(&mut self) -> SystemClockView {
        self.settings.refresh();
        self.render_at(Local::now().naive_local())
    }

    pub fn render_at(&self, now: NaiveDateTime) -> SystemClockView {
        let settings = self.settings.get();
        let time_format = if settings.show_seconds {
            "%H:%M:%S"
        } else {
            "%H:%M"
        };

        SystemClockView {
            time: now.format(time_format).to_string(),
            date: settings
                .show_date
                .then(|| now.format(&qt_to_strftime(&settings.date_format)).to_string()),
            style: TextStyle::new(&settings.font_family, settings.font_size, &settings.font_color),
        }
    }
}

/// Translates the Qt date tokens users put in the settings file into a
/// `strftime` pattern. Unrecognised characters pass through literally.
pub fn qt_to_strftime(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&next| next == c).count();

        let (token, used) = match (c, run) {
            ('y', n) if n >= 4 => ("%Y", 4),
            ('y', n) if n >= 2 => ("%y", 2),
            ('M', n) if n >= 4 => ("%B", 4),
            ('M', 3) => ("%b", 3),
            ('M', 2) => ("%m", 2),
            ('M', 1) => ("%-m", 1),
            ('d', n) if n >= 4 => ("%A", 4),
            ('d', 3) => ("%a", 3),
            ('d', 2) => ("%d", 2),
            ('d', 1) => ("%-d", 1),
            ('H', n) if n >= 2 => ("%H", 2),
            ('H', 1) => ("%-H", 1),
            ('h', n) if n >= 2 => ("%I", 2),
            ('h', 1) => ("%-I", 1),
            ('m', n) if n >= 2 => ("%M", 2),
            ('m', 1) => ("%-M", 1),
            ('s', n) if n >= 2 => ("%S", 2),
            ('s', 1) => ("%-S", 1),
            ('%', _) => ("%%", 1),
            _ => {
                out.push(c);
                i += 1;
                continue;
            }
        };

        out.push_str(token);
        i += used;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn translates_qt_patterns() {
        assert_eq!(qt_to_strftime("dd.MM.yyyy"), "%d.%m.%Y");
        assert_eq!(qt_to_strftime("d/M/yy"), "%-d/%-m/%y");
        assert_eq!(qt_to_strftime("dddd, MMMM d"), "%A, %B %-d");
        assert_eq!(qt_to_strftime("100%"), "100%%");
    }

    #[test]
    fn default_shows_seconds_and_no_date() {
        let dir = tempdir().unwrap();
        let widget = SystemClockWidget::new(dir.path().join("system_clock.json")).unwrap();

        let view = widget.render_at(at(9, 5, 3));
        assert_eq!(view.time, "09:05:03");
        assert_eq!(view.date, None);
    }

    #[test]
    fn honours_date_and_seconds_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("system_clock.json");
        fs::write(
            &path,
            r#"{ "show_seconds": false, "show_date": true, "date_format": "yyyy-MM-dd" }"#,
        )
        .unwrap();

        let widget = SystemClockWidget::new(path).unwrap();
        let view = widget.render_at(at(21, 40, 59));
        assert_eq!(view.time, "21:40");
        assert_eq!(view.date.as_deref(), Some("2024-03-07"));
    }
}

use std::{
    collections::VecDeque,
    fs,
    path::PathBuf,
    time::SystemTime,
};

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ConsoleView {
    pub lines: Vec<String>,
}

/// Tail of the application log file.
pub struct ConsoleWidget {
    path: PathBuf,
    max_lines: usize,
    last_mtime: Option<SystemTime>,
    view: ConsoleView,
}

impl ConsoleWidget {
    pub fn new(path: PathBuf, max_lines: usize) -> Self {
        Self {
            path,
            max_lines,
            last_mtime: None,
            view: ConsoleView::default(),
        }
    }

    pub fn tick(&mut self) -> &ConsoleView {
        let mtime = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok();

        if mtime.is_none() {
            self.last_mtime = None;
            self.view.lines.clear();
        } else if mtime != self.last_mtime {
            self.last_mtime = mtime;
            // The log is written concurrently; a torn last line is fine here.
            if let Ok(bytes) = fs::read(&self.path) {
                self.view.lines = tail(&String::from_utf8_lossy(&bytes), self.max_lines);
            }
        }

        &self.view
    }
}

fn tail(contents: &str, max_lines: usize) -> Vec<String> {
    let mut kept = VecDeque::with_capacity(max_lines);
    for line in contents.lines() {
        if kept.len() == max_lines {
            kept.pop_front();
        }
        if max_lines > 0 {
            kept.push_back(line.trim().to_string());
        }
    }
    kept.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn keeps_last_lines_trimmed() {
        let text = (1..=70)
            .map(|n| format!("  line {n}  "))
            .collect::<Vec<_>>()
            .join("\n");
        let lines = tail(&text, 64);
        assert_eq!(lines.len(), 64);
        assert_eq!(lines.first().map(String::as_str), Some("line 7"));
        assert_eq!(lines.last().map(String::as_str), Some("line 70"));
    }

    #[test]
    fn empty_when_log_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let mut widget = ConsoleWidget::new(path.clone(), 64);
        assert!(widget.tick().lines.is_empty());

        fs::write(&path, "[10:00:00] INFO daywatch: started\n").unwrap();
        assert_eq!(widget.tick().lines, vec!["[10:00:00] INFO daywatch: started"]);

        fs::remove_file(&path).unwrap();
        assert!(widget.tick().lines.is_empty());
    }
}

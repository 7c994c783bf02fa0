// Oxygen - ui/console.rs
//
// Console presentation of tailed log lines: level classification and
// timestamped formatting.

use crate::core::model::LogLine;
use crate::ui::theme;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

/// Display level of a console line. Purely cosmetic; the log watcher never
/// interprets line content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Success,
    Debug,
    Info,
}

impl LogLevel {
    /// Classify by case-insensitive substring. Checked in the order
    /// error, warning, success, debug; anything else is info.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        // "[error]" and "[warn]" are covered by the bare words.
        if has(&["error"]) {
            Self::Error
        } else if has(&["warn"]) {
            Self::Warning
        } else if has(&["success", "loaded", "connected"]) {
            Self::Success
        } else if has(&["debug"]) {
            Self::Debug
        } else {
            Self::Info
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARN",
            Self::Success => "OK",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `[HH:MM:SS] LEVEL text`, optionally coloured.
pub fn format_line(line: &LogLine, at: DateTime<Local>, colour: bool) -> String {
    let level = LogLevel::classify(&line.text);
    let stamp = at.format("%H:%M:%S");
    let body = format!("[{stamp}] {:<5} {}", level.label(), line.text);
    if colour {
        theme::paint(level, &body)
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_classification_order() {
        assert_eq!(LogLevel::classify("[ERROR] failed"), LogLevel::Error);
        assert_eq!(LogLevel::classify("warning: error ahead"), LogLevel::Error);
        assert_eq!(LogLevel::classify("[WARN] slow frame"), LogLevel::Warning);
        assert_eq!(LogLevel::classify("Script loaded"), LogLevel::Success);
        assert_eq!(LogLevel::classify("Connected to server"), LogLevel::Success);
        assert_eq!(LogLevel::classify("[DEBUG] tick"), LogLevel::Debug);
        assert_eq!(LogLevel::classify("hello world"), LogLevel::Info);
    }

    #[test]
    fn test_format_line_plain() {
        let at = Local.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let line = LogLine {
            text: "debug mode on".to_string(),
        };
        assert_eq!(format_line(&line, at, false), "[03:04:05] DEBUG debug mode on");
    }
}

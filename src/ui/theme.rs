// Oxygen - ui/theme.rs
//
// Terminal colour scheme for console levels.
// No dependencies on app state or business logic.

use crate::ui::console::LogLevel;

const RESET: &str = "\x1b[0m";

/// 24-bit foreground colour for a console level.
pub fn level_colour(level: LogLevel) -> (u8, u8, u8) {
    match level {
        LogLevel::Error => (220, 38, 38),    // Red 600
        LogLevel::Warning => (217, 119, 6),  // Amber 600
        LogLevel::Success => (22, 163, 74),  // Green 600
        LogLevel::Debug => (107, 114, 128),  // Gray 500
        LogLevel::Info => (209, 213, 219),   // Gray 300
    }
}

/// Wrap `text` in the ANSI escapes for `level`.
pub fn paint(level: LogLevel, text: &str) -> String {
    let (r, g, b) = level_colour(level);
    format!("\x1b[38;2;{r};{g};{b}m{text}{RESET}")
}

/// Level whose colour a port status cell is painted in.
pub fn status_level(online: bool) -> LogLevel {
    if online {
        LogLevel::Success
    } else {
        LogLevel::Debug
    }
}

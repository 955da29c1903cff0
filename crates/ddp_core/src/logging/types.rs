//! Log levels, logger configuration and line prefixes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Behaviour of one run's `JobLogger`.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Keep raw tool output out of the file and thin out progress lines.
    pub compact: bool,
    /// Progress percentage between logged lines in compact mode.
    pub progress_step: u32,
    /// Tool output lines remembered for failure reports.
    pub error_tail: usize,
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            progress_step: 20,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

/// Receives every formatted log line, e.g. to print it above a progress bar.
pub type ConsoleCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Markers that make a run log easy to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrefix {
    /// `$ truehdd decode ...`
    Command,
    /// `=== Encode Atmos 5.1 ===`
    Phase,
    /// `--- Run settings ---`
    Section,
    Success,
    Warning,
    Error,
}

impl MessagePrefix {
    pub fn format(&self, message: &str) -> String {
        match self {
            MessagePrefix::Command => format!("$ {}", message),
            MessagePrefix::Phase => format!("=== {} ===", message),
            MessagePrefix::Section => format!("--- {} ---", message),
            MessagePrefix::Success => format!("[OK] {}", message),
            MessagePrefix::Warning => format!("[WARNING] {}", message),
            MessagePrefix::Error => format!("[ERROR] {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_format() {
        assert_eq!(MessagePrefix::Phase.format("Decode"), "=== Decode ===");
        assert_eq!(MessagePrefix::Command.format("dee -x job.xml"), "$ dee -x job.xml");
        assert_eq!(MessagePrefix::Success.format("done"), "[OK] done");
    }

    #[test]
    fn levels_order_and_filter() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Error > LogLevel::Warn);
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
    }
}

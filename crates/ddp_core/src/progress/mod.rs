//! Progress reporting for external tools.
//!
//! Tool output formats are scraped by [`ProgressParser`] implementations,
//! one per tool, so a format change in a tool touches one parser only.
//! A [`ProgressReporter`] is scoped to a single tool run: it feeds lines to
//! its parser and forwards updates to a [`ProgressSink`], which renders
//! them (the CLI uses a terminal bar). Parse failures are ignored.

mod parsers;
mod reporter;

pub use parsers::{
    parser_for, DeeProgressParser, NoProgressParser, SoxProgressParser, TruehddProgressParser,
};
pub use reporter::{NullProgress, ProgressReporter, ProgressSink};

/// Information scraped from one output line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressUpdate {
    /// Completion in percent, 0..=100.
    pub percent: Option<f64>,
    /// Dialnorm (dB) measured so far.
    pub dialnorm: Option<i32>,
}

impl ProgressUpdate {
    pub fn percent(value: f64) -> Self {
        Self {
            percent: Some(value.clamp(0.0, 100.0)),
            dialnorm: None,
        }
    }

    pub fn dialnorm(value: i32) -> Self {
        Self {
            percent: None,
            dialnorm: Some(value),
        }
    }
}

/// Extracts progress from a tool's output lines.
pub trait ProgressParser: Send {
    /// Parse one line. Returns `None` for lines carrying no progress.
    fn parse_line(&mut self, line: &str) -> Option<ProgressUpdate>;
}

//! Per-tool progress parsers.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ProgressParser, ProgressUpdate};
use crate::tools::Tool;

static DEE_PROGRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Overall progress:\s*(\d+(?:\.\d+)?)").expect("valid regex"));

static DEE_LOUDNESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[Source loudness\].*measured_loudness=(-?\d+(?:\.\d+)?)").expect("valid regex")
});

static PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").expect("valid regex"));

static SOX_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"In:\s*(\d{1,3}(?:\.\d+)?)%").expect("valid regex"));

/// Parser for the encoding engine.
///
/// Reads `Overall progress: N.N` and the source loudness measurement,
/// which becomes the running dialnorm.
#[derive(Debug, Default)]
pub struct DeeProgressParser;

impl ProgressParser for DeeProgressParser {
    fn parse_line(&mut self, line: &str) -> Option<ProgressUpdate> {
        if let Some(caps) = DEE_PROGRESS.captures(line) {
            let value: f64 = caps[1].parse().ok()?;
            return Some(ProgressUpdate::percent(value));
        }
        if let Some(caps) = DEE_LOUDNESS.captures(line) {
            let value: f64 = caps[1].parse().ok()?;
            return Some(ProgressUpdate::dialnorm(value.round() as i32));
        }
        None
    }
}

/// Parser for the TrueHD decoder's `--progress` meter.
#[derive(Debug, Default)]
pub struct TruehddProgressParser;

impl ProgressParser for TruehddProgressParser {
    fn parse_line(&mut self, line: &str) -> Option<ProgressUpdate> {
        let caps = PERCENT.captures(line)?;
        let value: f64 = caps[1].parse().ok()?;
        if value > 100.0 {
            return None;
        }
        Some(ProgressUpdate::percent(value))
    }
}

/// Parser for sox `-S` status lines (`In:12.34% 00:00:05.00 [...]`).
#[derive(Debug, Default)]
pub struct SoxProgressParser;

impl ProgressParser for SoxProgressParser {
    fn parse_line(&mut self, line: &str) -> Option<ProgressUpdate> {
        let caps = SOX_INPUT.captures(line)?;
        let value: f64 = caps[1].parse().ok()?;
        Some(ProgressUpdate::percent(value))
    }
}

/// For tools that print no progress.
#[derive(Debug, Default)]
pub struct NoProgressParser;

impl ProgressParser for NoProgressParser {
    fn parse_line(&mut self, _line: &str) -> Option<ProgressUpdate> {
        None
    }
}

/// Parser matching a tool's output format.
pub fn parser_for(tool: Tool) -> Box<dyn ProgressParser> {
    match tool {
        Tool::Dee => Box::new(DeeProgressParser),
        Tool::Truehdd => Box::new(TruehddProgressParser),
        Tool::Resampler => Box::new(SoxProgressParser),
        Tool::LayoutFix | Tool::AdmConverter => Box::new(NoProgressParser),
    }
}

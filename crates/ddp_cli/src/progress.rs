//! Terminal progress bar for tool runs.

use std::sync::Arc;
use std::time::Duration;

use ddp_core::orchestrator::SharedConsole;
use ddp_core::progress::ProgressSink;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Positions per percent; the bar has one decimal of resolution.
const SCALE: f64 = 10.0;

pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(100 * SCALE as u64), ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::with_template(
                "{prefix:>14} [{bar:40.cyan/blue}] {msg}  [{elapsed_precise} < {eta_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        bar.enable_steady_tick(Duration::from_millis(250));
        Self { bar }
    }

    /// Console that prints above the bar instead of through it.
    pub fn console(&self) -> SharedConsole {
        let bar = self.bar.clone();
        Arc::new(move |line: &str| bar.println(line))
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn begin(&self, label: &str) {
        self.bar.reset();
        self.bar.set_prefix(label.to_string());
        self.bar.set_message(format_message(0.0, None));
    }

    fn update(&self, percent: f64, detail: Option<&str>) {
        let percent = percent.clamp(0.0, 100.0);
        self.bar.set_position((percent * SCALE).round() as u64);
        self.bar.set_message(format_message(percent, detail));
    }

    fn finish(&self, label: &str) {
        self.bar.println(format!("{} done", label));
    }

    fn abandon(&self) {
        self.bar.println("aborted");
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

fn format_message(percent: f64, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("{:5.1}%  {}", percent, detail),
        None => format!("{:5.1}%", percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_has_one_decimal() {
        assert_eq!(format_message(42.25, None), " 42.2%");
        assert_eq!(
            format_message(100.0, Some("dialnorm_Average: -27 dB")),
            "100.0%  dialnorm_Average: -27 dB"
        );
    }
}

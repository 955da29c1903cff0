//! Run-scoped progress reporter and the sink it renders to.

use super::{ProgressParser, ProgressUpdate};
use crate::logging::JobLogger;

/// Renders progress for one tool run at a time.
pub trait ProgressSink: Send + Sync {
    /// A tool run starts.
    fn begin(&self, label: &str);

    /// New percentage, with an optional tool-specific detail line.
    fn update(&self, percent: f64, detail: Option<&str>);

    /// The tool finished successfully.
    fn finish(&self, label: &str);

    /// The tool failed or was cancelled.
    fn abandon(&self) {}
}

/// Sink that renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn begin(&self, _label: &str) {}
    fn update(&self, _percent: f64, _detail: Option<&str>) {}
    fn finish(&self, _label: &str) {}
}

/// Progress state for a single tool run.
pub struct ProgressReporter<'a> {
    label: String,
    parser: Box<dyn ProgressParser>,
    sink: &'a dyn ProgressSink,
    logger: Option<&'a JobLogger>,
    forced_dialnorm: Option<i32>,
    measured_dialnorm: Option<i32>,
    percent: f64,
}

impl<'a> ProgressReporter<'a> {
    /// Start reporting; calls `begin` on the sink.
    pub fn new(
        label: impl Into<String>,
        parser: Box<dyn ProgressParser>,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        let label = label.into();
        sink.begin(&label);
        Self {
            label,
            parser,
            sink,
            logger: None,
            forced_dialnorm: None,
            measured_dialnorm: None,
            percent: 0.0,
        }
    }

    /// Also log percentage steps to the run log.
    pub fn with_logger(mut self, logger: &'a JobLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Dialnorm to display regardless of what the tool measures.
    pub fn with_forced_dialnorm(mut self, dialnorm: Option<i32>) -> Self {
        self.forced_dialnorm = dialnorm;
        self
    }

    /// Feed one output line.
    pub fn feed(&mut self, line: &str) {
        if let Some(update) = self.parser.parse_line(line) {
            self.apply(update);
        }
    }

    fn apply(&mut self, update: ProgressUpdate) {
        if self.measured_dialnorm.is_none() {
            self.measured_dialnorm = update.dialnorm;
        }
        if let Some(percent) = update.percent {
            self.percent = percent;
            if let Some(logger) = self.logger {
                logger.progress(&self.label, percent as u32);
            }
        }
        let detail = self.detail();
        self.sink.update(self.percent, detail.as_deref());
    }

    /// Detail shown next to the bar.
    fn detail(&self) -> Option<String> {
        self.forced_dialnorm
            .or(self.measured_dialnorm)
            .map(|d| format!("dialnorm_Average: {} dB", d))
    }

    /// Complete the run; returns the dialnorm the tool measured, if any.
    pub fn finish(self) -> Option<i32> {
        self.sink.update(100.0, self.detail().as_deref());
        self.sink.finish(&self.label);
        self.measured_dialnorm
    }

    pub fn abandon(self) {
        self.sink.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::DeeProgressParser;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<String>>,
    }

    impl ProgressSink for RecordingSink {
        fn begin(&self, label: &str) {
            self.events.lock().push(format!("begin {}", label));
        }

        fn update(&self, percent: f64, detail: Option<&str>) {
            self.events
                .lock()
                .push(format!("{:.1} {}", percent, detail.unwrap_or("-")));
        }

        fn finish(&self, label: &str) {
            self.events.lock().push(format!("finish {}", label));
        }

        fn abandon(&self) {
            self.events.lock().push("abandon".to_string());
        }
    }

    #[test]
    fn forwards_parsed_updates() {
        let sink = RecordingSink::default();
        let mut reporter = ProgressReporter::new("Encode", Box::new(DeeProgressParser), &sink);

        reporter.feed("noise");
        reporter.feed("Overall progress: 12.5");
        reporter.feed("[Source loudness] measured_loudness=-23.4");
        reporter.feed("Overall progress: 80.0");
        let measured = reporter.finish();

        assert_eq!(measured, Some(-23));
        let events = sink.events.lock();
        assert_eq!(
            *events,
            vec![
                "begin Encode",
                "12.5 -",
                "12.5 dialnorm_Average: -23 dB",
                "80.0 dialnorm_Average: -23 dB",
                "100.0 dialnorm_Average: -23 dB",
                "finish Encode",
            ]
        );
    }

    #[test]
    fn forced_dialnorm_wins_display() {
        let sink = RecordingSink::default();
        let mut reporter = ProgressReporter::new("Encode", Box::new(DeeProgressParser), &sink)
            .with_forced_dialnorm(Some(-27));

        reporter.feed("[Source loudness] measured_loudness=-20.0");
        assert_eq!(reporter.finish(), Some(-20));

        let events = sink.events.lock();
        assert!(events[1].ends_with("dialnorm_Average: -27 dB"));
    }

    #[test]
    fn first_measured_loudness_sticks() {
        let sink = RecordingSink::default();
        let mut reporter = ProgressReporter::new("Encode", Box::new(DeeProgressParser), &sink);

        reporter.feed("[Source loudness] measured_loudness=-24.6");
        reporter.feed("Overall progress: 50.0");
        reporter.feed("[Source loudness] measured_loudness=-18.2");

        assert_eq!(reporter.finish(), Some(-25));
        let events = sink.events.lock();
        assert!(events.iter().all(|e| !e.contains("-18 dB")));
    }

    #[test]
    fn abandon_skips_finish() {
        let sink = RecordingSink::default();
        let reporter = ProgressReporter::new("Decode", Box::new(DeeProgressParser), &sink);
        reporter.abandon();
        assert_eq!(*sink.events.lock(), vec!["begin Decode", "abandon"]);
    }
}

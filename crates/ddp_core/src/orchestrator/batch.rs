//! Folder mode: encode every supported input in a directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::errors::{EXIT_CANCELLED, EXIT_FAILURE};
use super::job::{EncodeJob, JobReport, SharedConsole};
use super::pipeline::CancelHandle;
use crate::config::Settings;
use crate::models::{EncodeOptions, InputKind};
use crate::progress::{NullProgress, ProgressSink};

/// Supported inputs directly inside `dir`, sorted by name.
pub fn collect_inputs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut inputs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && InputKind::from_path(path).is_some())
        .collect();
    inputs.sort();
    Ok(inputs)
}

/// Result for one input of a batch.
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub input: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<JobReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub exit_code: i32,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
    /// Inputs not attempted because the batch was cancelled.
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.exit_code == 0).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    /// Process exit code: cancellation wins, then any failure.
    pub fn exit_code(&self) -> i32 {
        if self.items.iter().any(|i| i.exit_code == EXIT_CANCELLED) {
            EXIT_CANCELLED
        } else if let Some(item) = self.items.iter().find(|i| i.exit_code != 0) {
            item.exit_code
        } else if self.items.is_empty() {
            EXIT_FAILURE
        } else {
            0
        }
    }
}

/// Runs inputs one after another with shared options.
pub struct BatchRunner {
    options: EncodeOptions,
    settings: Settings,
    cancel: CancelHandle,
    progress: Arc<dyn ProgressSink>,
    console: Option<SharedConsole>,
}

impl BatchRunner {
    /// `options.input` is ignored; each run gets its own input.
    pub fn new(options: EncodeOptions, settings: Settings) -> Self {
        Self {
            options,
            settings,
            cancel: CancelHandle::new(),
            progress: Arc::new(NullProgress),
            console: None,
        }
    }

    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn with_console(mut self, console: SharedConsole) -> Self {
        self.console = Some(console);
        self
    }

    /// Encode every input in `dir`. Stops at the first cancellation.
    pub fn run_dir(&self, dir: &Path) -> io::Result<BatchReport> {
        let inputs = collect_inputs(dir)?;
        tracing::info!("Found {} input(s) in {}", inputs.len(), dir.display());
        Ok(self.run(&inputs))
    }

    pub fn run(&self, inputs: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::default();

        for (index, input) in inputs.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.skipped.extend(inputs[index..].iter().cloned());
                break;
            }

            tracing::info!("[{}/{}] {}", index + 1, inputs.len(), input.display());
            let mut job = EncodeJob::new(self.options.with_input(input), self.settings.clone())
                .with_cancel_handle(self.cancel.clone())
                .with_progress_sink(Arc::clone(&self.progress));
            if let Some(ref console) = self.console {
                job = job.with_console(Arc::clone(console));
            }

            let item = match job.run() {
                Ok(job_report) => BatchItem {
                    input: input.clone(),
                    report: Some(job_report),
                    error: None,
                    exit_code: 0,
                },
                Err(e) => {
                    tracing::error!("{}: {}", input.display(), e);
                    BatchItem {
                        input: input.clone(),
                        report: None,
                        exit_code: e.exit_code(),
                        error: Some(e.to_string()),
                    }
                }
            };
            let cancelled = item.exit_code == EXIT_CANCELLED;
            report.items.push(item);

            if cancelled {
                report.skipped.extend(inputs[index + 1..].iter().cloned());
                break;
            }
        }

        tracing::info!(
            "Batch finished: {} succeeded, {} failed, {} skipped",
            report.succeeded(),
            report.failed(),
            report.skipped.len()
        );
        report
    }
}

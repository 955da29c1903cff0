//! Per-run log file.
//!
//! One `JobLogger` lives for one encode run. It writes `<logs>/<job>.log`,
//! mirrors every line to an optional console callback, thins out tool
//! progress in compact mode and remembers the last lines a tool printed so
//! they can be replayed when that tool fails.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{ConsoleCallback, LogConfig, LogLevel, MessagePrefix};

/// One captured line of tool output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailLine {
    pub text: String,
    pub stderr: bool,
}

#[derive(Default)]
struct LoggerState {
    writer: Option<BufWriter<File>>,
    tail: VecDeque<TailLine>,
    /// Label and percent of the last progress line written.
    last_progress: Option<(String, u32)>,
}

pub struct JobLogger {
    job_name: String,
    log_path: PathBuf,
    config: LogConfig,
    console: Option<ConsoleCallback>,
    state: Mutex<LoggerState>,
}

impl JobLogger {
    /// Open `<log_dir>/<job_name>.log`, truncating an older log of the same job.
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        console: Option<ConsoleCallback>,
    ) -> std::io::Result<Self> {
        let job_name = job_name.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", log_file_stem(&job_name)));
        let mut writer = BufWriter::new(File::create(&log_path)?);
        writeln!(
            writer,
            "# {} log for {}, started {}",
            env!("CARGO_PKG_NAME"),
            job_name,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;

        Ok(Self {
            job_name,
            log_path,
            state: Mutex::new(LoggerState {
                writer: Some(writer),
                tail: VecDeque::with_capacity(config.error_tail),
                last_progress: None,
            }),
            config,
            console,
        })
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if level >= self.config.level {
            self.emit(message);
        }
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(job = %self.job_name, "{}", message);
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        tracing::error!(job = %self.job_name, "{}", message);
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Start of a pipeline step.
    pub fn phase(&self, name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(name));
    }

    pub fn section(&self, name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Section.format(name));
    }

    /// A tool command line, as one line.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    /// A tool command line, one argument per line.
    pub fn command_pretty(&self, tokens: &[String]) {
        let Some((program, args)) = tokens.split_first() else {
            return;
        };
        let mut text = MessagePrefix::Command.format(program);
        for arg in args {
            text.push_str(" \\\n    ");
            text.push_str(arg);
        }
        self.log(LogLevel::Info, &text);
    }

    /// Progress of the tool run called `label`.
    ///
    /// In compact mode only crossings of `progress_step` and the final
    /// 100% are written. Returns whether a line was written.
    pub fn progress(&self, label: &str, percent: u32) -> bool {
        let percent = percent.min(100);
        {
            let mut state = self.state.lock();
            let previous = match &state.last_progress {
                Some((last_label, last)) if last_label == label => Some(*last),
                _ => None,
            };
            if !self.should_log_progress(previous, percent) {
                return false;
            }
            state.last_progress = Some((label.to_string(), percent));
        }
        self.info(&format!("{}: {}%", label, percent));
        true
    }

    fn should_log_progress(&self, previous: Option<u32>, percent: u32) -> bool {
        if !self.config.compact {
            return previous != Some(percent);
        }
        let step = self.config.progress_step.max(1);
        let bucket = percent / step;
        match previous {
            None => percent == 0 || bucket > 0,
            Some(last) if percent == 100 => last < 100,
            Some(last) => bucket > last / step,
        }
    }

    /// Forget progress so the next tool run starts at 0%.
    pub fn reset_progress(&self) {
        self.state.lock().last_progress = None;
    }

    /// Record one line of tool output. Written to the file only outside
    /// compact mode; always kept in the tail.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        if self.config.error_tail > 0 {
            let mut state = self.state.lock();
            if state.tail.len() == self.config.error_tail {
                state.tail.pop_front();
            }
            state.tail.push_back(TailLine {
                text: line.to_string(),
                stderr: is_stderr,
            });
        }

        if !self.config.compact {
            let text = if is_stderr {
                format!("[stderr] {}", line)
            } else {
                line.to_string()
            };
            self.log(LogLevel::Debug, &text);
        }
    }

    /// Replay the captured tool output after `tool` failed.
    pub fn show_tail(&self, tool: &str) {
        let lines = self.tail();
        if lines.is_empty() {
            return;
        }
        self.emit(&MessagePrefix::Section.format(&format!("last {} lines from {}", lines.len(), tool)));
        for line in &lines {
            let marker = if line.stderr { "!" } else { "|" };
            self.emit(&format!("{} {}", marker, line.text));
        }
    }

    pub fn tail(&self) -> Vec<TailLine> {
        self.state.lock().tail.iter().cloned().collect()
    }

    pub fn clear_tail(&self) {
        self.state.lock().tail.clear();
    }

    pub fn flush(&self) {
        if let Some(writer) = self.state.lock().writer.as_mut() {
            let _ = writer.flush();
        }
    }

    /// Close the file. Later messages still reach the console.
    pub fn close(&self) {
        if let Some(mut writer) = self.state.lock().writer.take() {
            let _ = writer.flush();
        }
    }

    fn emit(&self, message: &str) {
        let line = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        };

        if let Some(writer) = self.state.lock().writer.as_mut() {
            let _ = writeln!(writer, "{}", line);
        }
        if let Some(console) = &self.console {
            console(&line);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Job names come from input file stems; keep path separators and shell
/// metacharacters out of the log file name.
fn log_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.trim().is_empty() {
        "run".to_string()
    } else {
        stem
    }
}

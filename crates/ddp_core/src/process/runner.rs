//! Running external tools, captured or streamed.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::command::ToolCommand;
use super::lines::LineSplitter;
use crate::orchestrator::{CancelHandle, StepError, StepResult};

/// How often the wait loop checks for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Output lines kept for the failure message.
const DIAGNOSTIC_TAIL: usize = 20;

#[cfg(unix)]
const SIGINT: i32 = 2;
#[cfg(unix)]
const SIGTERM: i32 = 15;

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn is_stderr(&self) -> bool {
        matches!(self, OutputStream::Stderr)
    }
}

/// Result of a short run. A non-zero exit is not an error here.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// `None` if the tool was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

/// Summary of a successful streamed run.
#[derive(Debug, Clone)]
pub struct StreamedRun {
    pub lines_read: usize,
    /// Last lines of output, oldest first.
    pub tail: Vec<String>,
}

/// Run a tool to completion and capture its output.
///
/// Used for short queries (`truehdd info`, version checks). Only a failure
/// to spawn is an error.
pub fn run_captured(command: &ToolCommand) -> StepResult<CapturedOutput> {
    tracing::debug!("Running {}", command.display());

    let output = command
        .to_command()
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(command, e))?;

    let captured = CapturedOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    tracing::debug!(
        "{} exited with {:?} ({} bytes stdout)",
        command.tool_name(),
        captured.exit_code,
        captured.stdout.len()
    );

    Ok(captured)
}

/// Run a tool, handing each output line to `on_line` as it arrives.
///
/// Both pipes are drained on reader threads so the child never blocks on a
/// full buffer. The calling thread waits on a channel and checks `cancel`
/// every poll interval; on cancellation the child is killed and
/// `StepError::Cancelled` returned. A non-zero exit becomes
/// `StepError::ToolFailed` carrying the output tail verbatim.
pub fn run_streaming<F>(
    command: &ToolCommand,
    cancel: &CancelHandle,
    mut on_line: F,
) -> StepResult<StreamedRun>
where
    F: FnMut(&str, OutputStream),
{
    if cancel.is_cancelled() {
        return Err(StepError::Cancelled);
    }

    tracing::debug!("Streaming {}", command.display());

    let mut child = command
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(command, e))?;

    let (tx, rx) = mpsc::channel();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, OutputStream::Stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, OutputStream::Stderr, tx.clone()));
    }
    drop(tx);

    let mut tail: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_TAIL);
    let mut lines_read = 0;

    loop {
        if cancel.is_cancelled() {
            kill_child(&mut child, command);
            return Err(StepError::Cancelled);
        }

        match rx.recv_timeout(POLL_INTERVAL) {
            Ok((stream, line)) => {
                lines_read += 1;
                if tail.len() == DIAGNOSTIC_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line.clone());
                on_line(&line, stream);
            }
            Err(RecvTimeoutError::Timeout) => {}
            // Both pipes closed
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if cancel.is_cancelled() {
                    kill_child(&mut child, command);
                    return Err(StepError::Cancelled);
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(StepError::io(
                    format!("waiting for {}", command.tool_name()),
                    e,
                ))
            }
        }
    };

    for reader in readers {
        let _ = reader.join();
    }

    // Ctrl-C reaches the whole process group, so the child can die before
    // the signal watcher sets the flag.
    if interrupted(&status) {
        cancel.cancel();
    }
    if cancel.is_cancelled() {
        return Err(StepError::Cancelled);
    }

    let tail: Vec<String> = tail.into_iter().collect();
    if !status.success() {
        let exit_code = status.code().unwrap_or(-1);
        tracing::debug!("{} failed with exit code {}", command.tool_name(), exit_code);
        return Err(StepError::tool_failed(
            command.tool_name(),
            exit_code,
            tail.join("\n"),
        ));
    }

    Ok(StreamedRun { lines_read, tail })
}

fn spawn_reader<R>(
    mut source: R,
    stream: OutputStream,
    tx: Sender<(OutputStream, String)>,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut splitter = LineSplitter::new();
        let mut buf = [0u8; 4096];
        loop {
            match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    for line in splitter.push(&buf[..n]) {
                        if tx.send((stream, line)).is_err() {
                            return;
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        if let Some(line) = splitter.finish() {
            let _ = tx.send((stream, line));
        }
    })
}

fn kill_child(child: &mut Child, command: &ToolCommand) {
    tracing::info!("Terminating {}", command.tool_name());
    let _ = child.kill();
    let _ = child.wait();
}

/// Whether the child was stopped by SIGINT or SIGTERM.
#[cfg(unix)]
fn interrupted(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    matches!(status.signal(), Some(SIGINT) | Some(SIGTERM))
}

#[cfg(not(unix))]
fn interrupted(_status: &ExitStatus) -> bool {
    false
}

fn spawn_error(command: &ToolCommand, e: std::io::Error) -> StepError {
    StepError::io(
        format!(
            "starting {} ({})",
            command.tool_name(),
            command.program().display()
        ),
        e,
    )
}

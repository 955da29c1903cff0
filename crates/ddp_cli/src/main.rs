//! ddp-atmos-encode: TrueHD Atmos to DDP Atmos front-end.

mod cli;
mod progress;
mod signals;

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use ddp_core::config::{ConfigManager, ConfigSection};
use ddp_core::logging::{init_tracing, LogLevel};
use ddp_core::orchestrator::{
    BatchReport, BatchRunner, CancelHandle, EncodeJob, JobReport, SharedConsole, EXIT_FAILURE,
};
use ddp_core::progress::{NullProgress, ProgressSink};

use crate::cli::Cli;
use crate::progress::BarProgress;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(match cli.verbose {
        0 => LogLevel::Warn,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    });

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_FAILURE
        }
    };
    ExitCode::from(code.clamp(0, 255) as u8)
}

fn run(cli: &Cli) -> Result<i32> {
    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_default()
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    cli.apply(&mut config.settings_mut().encode);

    if cli.save_defaults {
        config
            .update_section(ConfigSection::Encode)
            .with_context(|| format!("Failed to save defaults to {}", cli.config.display()))?;
        eprintln!("Saved encode defaults to {}", cli.config.display());
    }
    let settings = config.settings().clone();

    let cancel = CancelHandle::new();
    signals::install(cancel.clone());

    let progress: Arc<dyn ProgressSink>;
    let console: SharedConsole;
    if !cli.json && std::io::stderr().is_terminal() {
        let bar = BarProgress::new();
        console = bar.console();
        progress = Arc::new(bar);
    } else {
        console = Arc::new(|line: &str| eprintln!("{}", line));
        progress = Arc::new(NullProgress);
    }

    if cli.input.is_dir() {
        let runner = BatchRunner::new(cli.encode_options(&settings, &cli.input), settings.clone())
            .with_cancel_handle(cancel)
            .with_progress_sink(progress)
            .with_console(console);
        let report = runner
            .run_dir(&cli.input)
            .with_context(|| format!("Failed to read {}", cli.input.display()))?;
        print_batch(cli, &report)?;
        return Ok(report.exit_code());
    }

    let job = EncodeJob::new(cli.encode_options(&settings, &cli.input), settings)
        .with_cancel_handle(cancel)
        .with_progress_sink(progress)
        .with_console(console);
    match job.run() {
        Ok(report) => {
            print_report(cli, &report)?;
            Ok(0)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(e.exit_code())
        }
    }
}

fn print_report(cli: &Cli, report: &JobReport) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for output in &report.outputs {
        println!("{}: {}", output.variant, output.path.display());
    }
    Ok(())
}

fn print_batch(cli: &Cli, report: &BatchReport) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for item in &report.items {
        match (&item.report, &item.error) {
            (Some(job), _) => {
                for output in &job.outputs {
                    println!("{}: {}", output.variant, output.path.display());
                }
            }
            (None, Some(error)) => println!("FAILED {}: {}", item.input.display(), error),
            (None, None) => {}
        }
    }
    for skipped in &report.skipped {
        println!("SKIPPED {}", skipped.display());
    }
    println!(
        "{} succeeded, {} failed, {} skipped",
        report.succeeded(),
        report.failed(),
        report.skipped.len()
    );
    Ok(())
}

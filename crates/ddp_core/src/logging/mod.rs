//! `tracing` setup for the process and the per-run log file.
//!
//! `tracing` carries diagnostics to stderr. What the user reads about a run
//! (phases, tool commands, progress steps, the tool tail on failure) goes
//! through [`JobLogger`] into `<logs>/<job>.log` and the console callback.
//!
//! ```no_run
//! use ddp_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("movie", ".logs", LogConfig::default(), None)?;
//! logger.phase("Decode TrueHD stream");
//! logger.progress("Decoding", 40);
//! # Ok::<(), std::io::Error>(())
//! ```

mod job_logger;
mod types;

pub use job_logger::{JobLogger, TailLine};
pub use types::{ConsoleCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the stderr subscriber. `RUST_LOG` wins over `default_level`.
/// Only the first call has an effect.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter()));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
}

//! External tool invocation.
//!
//! Tools are described by a [`ToolCommand`] and run either captured
//! (short queries) or streamed, where stdout and stderr are read
//! incrementally so progress can be rendered while the tool runs.

mod command;
mod lines;
mod runner;

pub use command::ToolCommand;
pub use lines::LineSplitter;
pub use runner::{run_captured, run_streaming, CapturedOutput, OutputStream, StreamedRun};

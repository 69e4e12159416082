//! Run external commands with ordered options and a normalized exit status.
//!
//! ```no_run
//! use executils_runner::{run, with_args, with_verbose};
//!
//! if let Err(err) = run("git", [with_verbose(), with_args(["status", "--short"])]) {
//!     eprintln!("{}", err);
//!     std::process::exit(executils_runner::exit_status(Some(&err)));
//! }
//! ```

pub mod executor;
pub mod invocation;
pub mod options;
mod process;

pub use executor::{run, Runner};
pub use invocation::{resolve_program, Invocation};
pub use options::*;

pub use executils_core::{
    exit_status, exit_status_of, CaptureBuffer, Environment, ExecutionError, OutputSink, ProcessFailure,
};

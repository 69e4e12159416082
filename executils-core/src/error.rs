use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutilsError {
    #[error("Expansion error: {0}")]
    ExpansionError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

pub type Result<T> = std::result::Result<T, ExecutilsError>;

/// Why a process run did not end with status 0.
#[derive(Error, Debug)]
pub enum ProcessFailure {
    /// The child ran and exited with a non-zero status.
    #[error("exit status {0}")]
    Exited(i32),

    /// The child was terminated without an exit status.
    #[error("terminated by {}", signal_name(.0))]
    Signaled(Option<i32>),

    /// The child could not be started at all.
    #[error("{0}")]
    Spawn(#[source] io::Error),

    /// The child ran but its output could not be forwarded to a sink.
    #[error("output forwarding failed: {0}")]
    Output(#[source] io::Error),
}

fn signal_name(signal: &Option<i32>) -> String {
    match signal {
        Some(signal) => format!("signal {}", signal),
        None => "unknown cause".to_string(),
    }
}

impl ProcessFailure {
    /// Translate a finished child's status. `None` when the child succeeded.
    pub fn from_status(status: std::process::ExitStatus) -> Option<Self> {
        if status.success() {
            return None;
        }

        if let Some(code) = status.code() {
            return Some(ProcessFailure::Exited(code));
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            Some(ProcessFailure::Signaled(status.signal()))
        }

        #[cfg(not(unix))]
        {
            Some(ProcessFailure::Signaled(None))
        }
    }

    /// The normalized integer status for this failure.
    ///
    /// A real exit carries its own status and a death by a known signal
    /// reports -1. Spawn failures, output failures and terminations with no
    /// known cause report the generic failure code 1.
    pub fn code(&self) -> i32 {
        match self {
            ProcessFailure::Exited(code) => *code,
            ProcessFailure::Signaled(Some(_)) => -1,
            ProcessFailure::Signaled(None) | ProcessFailure::Spawn(_) | ProcessFailure::Output(_) => 1,
        }
    }
}

/// The error returned by a failed run.
///
/// Displays as `Exit code N: <cause>`; `source()` yields the [`ProcessFailure`].
#[derive(Error, Debug)]
#[error("Exit code {code}: {failure}")]
pub struct ExecutionError {
    command: String,
    code: i32,
    #[source]
    failure: ProcessFailure,
}

impl ExecutionError {
    pub fn new(command: impl Into<String>, failure: ProcessFailure) -> Self {
        Self {
            command: command.into(),
            code: failure.code(),
            failure,
        }
    }

    /// Shorthand for a failure to start `command`.
    pub fn spawn(command: impl Into<String>, err: io::Error) -> Self {
        Self::new(command, ProcessFailure::Spawn(err))
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn failure(&self) -> &ProcessFailure {
        &self.failure
    }

    pub fn into_failure(self) -> ProcessFailure {
        self.failure
    }
}

/// Normalize any error into an integer exit status.
///
/// `None` is success (0). The crate's own error types report the status they
/// carry; every other error has no real status and maps to 1.
pub fn exit_status(err: Option<&(dyn std::error::Error + 'static)>) -> i32 {
    let Some(err) = err else {
        return 0;
    };

    if let Some(e) = err.downcast_ref::<ExecutionError>() {
        return e.code();
    }
    if let Some(e) = err.downcast_ref::<ProcessFailure>() {
        return e.code();
    }
    if let Some(ExecutilsError::Execution(e)) = err.downcast_ref::<ExecutilsError>() {
        return e.code();
    }

    1
}

/// [`exit_status`] for a run result.
pub fn exit_status_of<T>(result: &std::result::Result<T, ExecutionError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}

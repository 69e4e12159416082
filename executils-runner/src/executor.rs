use crate::invocation::{resolve_program, Invocation};
use crate::options::RunOption;
use crate::process;
use executils_core::{Environment, ExecutionError};
use executils_expand::{expand_all, expand_env};
use std::io;
use tracing::debug;

/// Runs commands against a fixed environment snapshot.
#[derive(Debug, Clone)]
pub struct Runner {
    environment: Environment,
}

impl Runner {
    /// Runner over a snapshot of the current process environment.
    pub fn new() -> Self {
        Self::with_environment(Environment::capture())
    }

    /// Runner over an explicit environment. It is both the base of every
    /// child environment and the source for `$VAR` expansion.
    pub fn with_environment(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Build the invocation for `command` without running it.
    pub fn prepare<I>(&self, command: &str, options: I) -> Result<Invocation, ExecutionError>
    where
        I: IntoIterator<Item = RunOption>,
    {
        let expanded = expand_env(command, &self.environment).map_err(|e| invalid_input(command, e))?;
        let program = resolve_program(&expanded, &self.environment);

        let mut inv = Invocation::new(command, program, self.environment.clone());
        for option in options {
            option.apply(&mut inv);
        }

        expand_all(&mut inv.args, &self.environment).map_err(|e| invalid_input(command, e))?;

        debug!(
            program = %inv.program.display(),
            args = ?inv.args,
            dir = ?inv.dir,
            "Invocation assembled"
        );

        Ok(inv)
    }

    /// Run `command` with `options` and wait for it to exit.
    pub fn run<I>(&self, command: &str, options: I) -> Result<(), ExecutionError>
    where
        I: IntoIterator<Item = RunOption>,
    {
        let inv = self.prepare(command, options)?;

        if inv.verbose {
            if let Err(e) = inv.stdout.write_all(inv.command_line().as_bytes()) {
                debug!(error = %e, "Could not echo command line");
            }
        }

        process::execute(&inv).map_err(|failure| ExecutionError::new(inv.display(), failure))
    }

    /// [`Runner::run`] on tokio's blocking pool.
    pub async fn run_async(&self, command: String, options: Vec<RunOption>) -> Result<(), ExecutionError> {
        let runner = self.clone();
        let label = command.clone();

        tokio::task::spawn_blocking(move || runner.run(&command, options))
            .await
            .map_err(|e| ExecutionError::spawn(label, io::Error::new(io::ErrorKind::Other, e)))?
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_input(command: &str, err: executils_core::ExecutilsError) -> ExecutionError {
    ExecutionError::spawn(command, io::Error::new(io::ErrorKind::InvalidInput, err))
}

/// Run `command` against the current process environment.
pub fn run<I>(command: &str, options: I) -> Result<(), ExecutionError>
where
    I: IntoIterator<Item = RunOption>,
{
    Runner::new().run(command, options)
}

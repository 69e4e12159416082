use executils_core::{Environment, OutputSink};
use std::path::{Path, PathBuf};

/// A pending process launch, built fresh for every run.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Executable actually spawned.
    pub program: PathBuf,
    /// Argument vector; element 0 is passed as the child's argv[0].
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
    pub env: Environment,
    pub stdout: OutputSink,
    pub stderr: OutputSink,
    pub verbose: bool,
}

impl Invocation {
    /// Describe a launch of `command`. `program` is the executable that
    /// `command` resolved to.
    pub fn new(command: &str, program: PathBuf, env: Environment) -> Self {
        Self {
            program,
            args: vec![command.to_string()],
            dir: None,
            env,
            stdout: OutputSink::Inherit,
            stderr: OutputSink::Inherit,
            verbose: false,
        }
    }

    /// Executable followed by every argument after argv[0].
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in self.args.iter().skip(1) {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }

    /// The line printed in verbose mode.
    pub fn command_line(&self) -> String {
        format!("Exec: {}\n", self.args.join(" "))
    }
}

/// Find `name` on the `PATH` of `env`.
///
/// Names containing a path separator are used as given, as is any name the
/// lookup cannot find; spawning reports the failure later.
pub fn resolve_program(name: &str, env: &Environment) -> PathBuf {
    if has_separator(name) {
        return PathBuf::from(name);
    }

    let Ok(cwd) = std::env::current_dir() else {
        return PathBuf::from(name);
    };

    which::which_in(name, env.lookup_os("PATH"), cwd).unwrap_or_else(|_| PathBuf::from(name))
}

fn has_separator(name: &str) -> bool {
    name.contains('/') || name.contains(std::path::MAIN_SEPARATOR)
}

/// Absolute form of `path`, or `path` unchanged when it cannot be resolved.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

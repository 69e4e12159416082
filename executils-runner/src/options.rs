//! Options that shape an [`Invocation`] before it runs.
//!
//! Options are applied in the order given. When two options touch the same
//! field, the later one wins.
//!
//! [`with_args`] rebuilds argv[0] from the executable known at the time it is
//! applied, so put [`with_path`] before it when argv[0] should show the new
//! executable.

use crate::invocation::{absolute, Invocation};
use executils_core::OutputSink;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum RunOption {
    Verbose,
    Path(PathBuf),
    Dir(PathBuf),
    StdOut(OutputSink),
    StdErr(OutputSink),
    StdOutOrErr(OutputSink),
    Env(Vec<String>),
    Args(Vec<String>),
}

impl RunOption {
    pub fn apply(self, inv: &mut Invocation) {
        match self {
            RunOption::Verbose => inv.verbose = true,
            RunOption::Path(path) => inv.program = absolute(&path),
            RunOption::Dir(dir) => inv.dir = Some(absolute(&dir)),
            RunOption::StdOut(sink) => inv.stdout = sink,
            RunOption::StdErr(sink) => inv.stderr = sink,
            RunOption::StdOutOrErr(sink) => {
                inv.stdout = sink.clone();
                inv.stderr = sink;
            }
            RunOption::Env(lines) => inv.env.extend(lines),
            RunOption::Args(args) => {
                let mut rebuilt = Vec::with_capacity(args.len() + 1);
                rebuilt.push(inv.display());
                rebuilt.extend(args);
                inv.args = rebuilt;
            }
        }
    }
}

/// Print `Exec: <args>` to the stdout sink before running.
pub fn with_verbose() -> RunOption {
    RunOption::Verbose
}

/// Run the executable at `path` instead of the looked-up command.
pub fn with_path(path: impl Into<PathBuf>) -> RunOption {
    RunOption::Path(path.into())
}

/// Working directory of the child.
pub fn with_dir(dir: impl Into<PathBuf>) -> RunOption {
    RunOption::Dir(dir.into())
}

pub fn with_stdout(sink: impl Into<OutputSink>) -> RunOption {
    RunOption::StdOut(sink.into())
}

pub fn with_stderr(sink: impl Into<OutputSink>) -> RunOption {
    RunOption::StdErr(sink.into())
}

/// Send both standard output and standard error to `sink`.
pub fn with_stdout_or_err(sink: impl Into<OutputSink>) -> RunOption {
    RunOption::StdOutOrErr(sink.into())
}

/// Append `KEY=VALUE` lines to the child environment.
pub fn with_env<I, S>(lines: I) -> RunOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    RunOption::Env(lines.into_iter().map(Into::into).collect())
}

/// Replace the arguments with `[display string, args...]`.
pub fn with_args<I, S>(args: I) -> RunOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    RunOption::Args(args.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use executils_core::{CaptureBuffer, Environment};

    fn invocation() -> Invocation {
        Invocation::new("tool", PathBuf::from("/opt/bin/tool"), Environment::from_lines(["BASE=1"]))
    }

    fn apply_all(options: Vec<RunOption>) -> Invocation {
        let mut inv = invocation();
        for option in options {
            option.apply(&mut inv);
        }
        inv
    }

    #[test]
    fn test_verbose() {
        assert!(apply_all(vec![with_verbose()]).verbose);
    }

    #[test]
    fn test_args_prefix_display_string() {
        let inv = apply_all(vec![with_args(["x", "y"])]);
        assert_eq!(inv.args, vec!["/opt/bin/tool", "x", "y"]);
    }

    #[test]
    fn test_args_applied_twice_accumulate_display() {
        let inv = apply_all(vec![with_args(["a"]), with_args(["b"])]);
        assert_eq!(inv.args, vec!["/opt/bin/tool a", "b"]);
    }

    #[test]
    fn test_path_before_args_is_reflected_in_argv0() {
        let inv = apply_all(vec![with_path("/usr/local/bin/other"), with_args(["x"])]);
        assert_eq!(inv.program, PathBuf::from("/usr/local/bin/other"));
        assert_eq!(inv.args, vec!["/usr/local/bin/other", "x"]);
    }

    #[test]
    fn test_path_after_args_leaves_argv0_stale() {
        let inv = apply_all(vec![with_args(["x"]), with_path("/usr/local/bin/other")]);
        assert_eq!(inv.program, PathBuf::from("/usr/local/bin/other"));
        assert_eq!(inv.args, vec!["/opt/bin/tool", "x"]);
    }

    #[test]
    fn test_relative_path_and_dir_become_absolute() {
        let inv = apply_all(vec![with_path("bin/tool"), with_dir("work")]);
        assert!(inv.program.is_absolute());
        assert!(inv.program.ends_with("bin/tool"));
        let dir = inv.dir.unwrap();
        assert!(dir.is_absolute());
        assert!(dir.ends_with("work"));
    }

    #[test]
    fn test_later_dir_wins() {
        let inv = apply_all(vec![with_dir("/first"), with_dir("/second")]);
        assert_eq!(inv.dir, Some(PathBuf::from("/second")));
    }

    #[test]
    fn test_env_is_additive() {
        let inv = apply_all(vec![with_env(["A=1"]), with_env(["A=2", "B=3"])]);
        assert_eq!(inv.env.lines(), vec!["BASE=1", "A=1", "A=2", "B=3"]);
        assert_eq!(inv.env.lookup("A").as_deref(), Some("2"));
    }

    #[test]
    fn test_stdout_or_err_sets_both() {
        let inv = apply_all(vec![with_stdout_or_err(CaptureBuffer::new())]);
        assert!(inv.stdout.is_piped());
        assert!(inv.stderr.is_piped());
    }

    #[test]
    fn test_later_sink_overrides_earlier() {
        let inv = apply_all(vec![
            with_stdout_or_err(CaptureBuffer::new()),
            with_stderr(OutputSink::Null),
        ]);
        assert!(inv.stdout.is_piped());
        assert!(matches!(inv.stderr, OutputSink::Null));
    }
}

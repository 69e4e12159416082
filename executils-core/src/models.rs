use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};

use crate::error::ExecutionError;

/// Ordered snapshot of environment variables.
///
/// Names and values are kept as raw `OsString`s so inherited variables reach
/// the child unchanged. Duplicates are kept; lookups resolve to the last
/// definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: Vec<(OsString, OsString)>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    /// Build from `KEY=VALUE` lines. Lines without `=` or with an empty key
    /// are dropped.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut env = Self::new();
        env.extend(lines);
        env
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_os_string(), v.as_ref().to_os_string()))
                .collect(),
        }
    }

    /// Append a `KEY=VALUE` line; malformed lines are ignored.
    pub fn push(&mut self, line: impl AsRef<str>) {
        if let Some((key, value)) = line.as_ref().split_once('=') {
            if !key.is_empty() {
                self.push_var(key, value);
            }
        }
    }

    pub fn push_var(&mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) {
        self.vars
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
    }

    pub fn extend<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.push(line);
        }
    }

    /// Raw value of `name`, taking the last definition.
    pub fn lookup_os(&self, name: &str) -> Option<&OsStr> {
        self.vars()
            .rev()
            .find(|(k, _)| *k == OsStr::new(name))
            .map(|(_, v)| v)
    }

    /// Value of `name` as text, for expansion. Invalid UTF-8 is replaced.
    pub fn lookup(&self, name: &str) -> Option<Cow<'_, str>> {
        self.lookup_os(name).map(OsStr::to_string_lossy)
    }

    /// Variables in definition order.
    pub fn vars(&self) -> impl DoubleEndedIterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    /// Variables as `KEY=VALUE` text, lossily decoded.
    pub fn lines(&self) -> Vec<String> {
        self.vars()
            .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Final status of a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
}

/// Record of a single run, suitable for printing as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub command: String,
    pub args: Vec<String>,
    pub status: RunStatus,
    pub exit_code: i32,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunReport {
    /// Start a report; the clock starts now.
    pub fn start(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            status: RunStatus::Success,
            exit_code: 0,
            error: None,
            duration_ms: 0,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn finish(mut self, result: &Result<(), ExecutionError>) -> Self {
        let completed_at = Utc::now();
        self.duration_ms = completed_at
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self.completed_at = Some(completed_at);

        match result {
            Ok(()) => {
                self.status = RunStatus::Success;
                self.exit_code = 0;
                self.error = None;
            }
            Err(e) => {
                self.status = RunStatus::Failed;
                self.exit_code = e.code();
                self.error = Some(e.to_string());
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessFailure;

    #[test]
    fn test_environment_last_definition_wins() {
        let mut env = Environment::new();
        env.push("A=1");
        env.push("B=x");
        env.push("A=2");

        assert_eq!(env.lookup("A").as_deref(), Some("2"));
        assert_eq!(env.lookup("B").as_deref(), Some("x"));
        assert_eq!(env.lookup("C"), None);
        assert_eq!(env.lines(), vec!["A=1", "B=x", "A=2"]);
    }

    #[test]
    fn test_environment_value_may_contain_equals() {
        let env = Environment::from_lines(["OPTS=a=b=c"]);
        assert_eq!(env.lookup("OPTS").as_deref(), Some("a=b=c"));
    }

    #[test]
    fn test_environment_drops_malformed_lines() {
        let env = Environment::from_lines(["NOVALUE", "=C:=C:\\", "OK=1"]);
        let vars: Vec<_> = env.vars().collect();
        assert_eq!(vars, vec![(OsStr::new("OK"), OsStr::new("1"))]);
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_environment_empty_value_is_defined() {
        let env = Environment::from_pairs([("EMPTY", "")]);
        assert_eq!(env.lookup("EMPTY").as_deref(), Some(""));
    }

    #[test]
    fn test_environment_capture_sees_process_vars() {
        let env = Environment::capture();
        if let Some(path) = std::env::var_os("PATH") {
            assert_eq!(env.lookup_os("PATH"), Some(path.as_os_str()));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_environment_keeps_non_utf8_values_raw() {
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"a\xffb");
        let mut env = Environment::new();
        env.push_var("RAW", raw);

        assert_eq!(env.lookup_os("RAW").map(OsStrExt::as_bytes), Some(&b"a\xffb"[..]));
        assert_eq!(env.lookup("RAW").as_deref(), Some("a\u{FFFD}b"));
    }

    #[test]
    fn test_run_report_success() {
        let report = RunReport::start("true", vec!["true".to_string()]).finish(&Ok(()));
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.exit_code, 0);
        assert!(report.error.is_none());
        assert!(report.completed_at.is_some());
    }

    #[test]
    fn test_run_report_failure_carries_code() {
        let result = Err(ExecutionError::new("false", ProcessFailure::Exited(3)));
        let report = RunReport::start("false", vec![]).finish(&result);
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.exit_code, 3);
        assert_eq!(report.error.as_deref(), Some("Exit code 3: exit status 3"));
    }

    #[test]
    fn test_run_report_serializes() {
        let report = RunReport::start("echo", vec!["echo".to_string(), "hi".to_string()]).finish(&Ok(()));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["command"], "echo");
        assert_eq!(json["status"], "Success");
        assert_eq!(json["args"][1], "hi");
    }
}

use executils_core::{ExecutilsError, Result};
use executils_runner::{with_dir, with_env, with_path, with_verbose, RunOption};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROFILE: &str = "xrun.toml";

pub const PROFILE_TEMPLATE: &str = r#"# xrun.toml - defaults applied before command-line flags

# Echo "Exec: <command line>" before running
verbose = false

# Working directory for the child (relative to where xrun is started)
# dir = "build"

# Run this executable instead of looking the command up on PATH
# path = "/usr/bin/make"

# Extra KEY=VALUE lines appended to the inherited environment
env = []
"#;

/// Defaults read from a TOML profile
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    pub verbose: bool,
    pub dir: Option<PathBuf>,
    pub path: Option<PathBuf>,
    pub env: Vec<String>,
}

impl Profile {
    pub fn parse(content: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(content)
            .map_err(|e| ExecutilsError::InvalidConfiguration(format!("Invalid profile: {}", e)))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ExecutilsError::InvalidConfiguration(format!("Failed to read profile at {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Load `explicit` if given, else `xrun.toml` in the current directory if
    /// present, else an empty profile.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        Self::discover_in(explicit, Path::new("."))
    }

    /// [`Profile::discover`] with the fallback profile looked up in `base`.
    pub fn discover_in(explicit: Option<&Path>, base: &Path) -> Result<Self> {
        let fallback = base.join(DEFAULT_PROFILE);
        match explicit {
            Some(path) => Self::load(path),
            None if fallback.is_file() => Self::load(&fallback),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(bad) = self.env.iter().find(|line| !is_env_line(line)) {
            return Err(ExecutilsError::InvalidConfiguration(format!(
                "env entry {:?} is not KEY=VALUE",
                bad
            )));
        }
        Ok(())
    }

    /// The profile as run options, to be placed before command-line flags.
    pub fn options(&self) -> Vec<RunOption> {
        let mut options = Vec::new();
        if self.verbose {
            options.push(with_verbose());
        }
        if let Some(path) = &self.path {
            options.push(with_path(path));
        }
        if let Some(dir) = &self.dir {
            options.push(with_dir(dir));
        }
        if !self.env.is_empty() {
            options.push(with_env(self.env.iter().cloned()));
        }
        options
    }
}

pub fn is_env_line(line: &str) -> bool {
    matches!(line.split_once('='), Some((key, _)) if !key.is_empty())
}

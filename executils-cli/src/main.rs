use anyhow::Context;
use clap::{Parser, Subcommand};
use executils_core::{exit_status_of, Environment, OutputSink, RunReport};
use executils_expand::expand_env;
use executils_runner::{
    with_args, with_dir, with_env, with_path, with_stderr, with_stdout, with_stdout_or_err, with_verbose,
    RunOption, Runner,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;

mod config;

use config::{is_env_line, Profile, DEFAULT_PROFILE, PROFILE_TEMPLATE};

#[derive(Parser)]
#[command(name = "xrun")]
#[command(about = "Run a command with expanded arguments and a normalized exit status", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Profile with default options (defaults to ./xrun.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command and exit with its status
    Run(RunArgs),

    /// Print text with $VAR references expanded from the current environment
    Expand {
        /// Text to expand
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Write a profile template
    Init {
        /// Overwrite an existing profile
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Echo the command line before running it
    #[arg(short, long)]
    verbose: bool,

    /// Working directory for the command
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Executable to run instead of looking the command up on PATH
    #[arg(long)]
    path: Option<PathBuf>,

    /// Extra environment entry (repeatable)
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env_line)]
    env: Vec<String>,

    /// Write standard output to FILE
    #[arg(long, value_name = "FILE")]
    stdout: Option<PathBuf>,

    /// Write standard error to FILE
    #[arg(long, value_name = "FILE")]
    stderr: Option<PathBuf>,

    /// Write standard output and standard error to the same FILE
    #[arg(long, value_name = "FILE", conflicts_with_all = ["stdout", "stderr"])]
    merge_output: Option<PathBuf>,

    /// Print a JSON run report when the command finishes
    #[arg(long)]
    json: bool,

    /// Command to run
    command: String,

    /// Arguments passed to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn parse_env_line(line: &str) -> Result<String, String> {
    if is_env_line(line) {
        Ok(line.to_string())
    } else {
        Err(format!("expected KEY=VALUE, got {:?}", line))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let profile = Profile::discover(cli.config.as_deref())?;
            let code = run_command(&profile, args).await?;
            process::exit(code);
        }
        Commands::Expand { texts } => {
            for line in expand_texts(&texts, &Environment::capture())? {
                println!("{}", line);
            }
        }
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_PROFILE));
            write_profile_template(&path, force)?;
        }
    }

    Ok(())
}

/// Expand each text against `env`, one output line per input.
fn expand_texts(texts: &[String], env: &Environment) -> executils_core::Result<Vec<String>> {
    texts.iter().map(|text| expand_env(text, env)).collect()
}

/// Profile options first, then flags, so flags win.
fn build_options(profile: &Profile, args: &RunArgs) -> anyhow::Result<Vec<RunOption>> {
    let mut options = profile.options();

    if args.verbose {
        options.push(with_verbose());
    }
    if let Some(path) = &args.path {
        options.push(with_path(path));
    }
    if let Some(dir) = &args.dir {
        options.push(with_dir(dir));
    }
    if !args.env.is_empty() {
        options.push(with_env(args.env.iter().cloned()));
    }
    if let Some(file) = &args.stdout {
        options.push(with_stdout(open_sink(file)?));
    }
    if let Some(file) = &args.stderr {
        options.push(with_stderr(open_sink(file)?));
    }
    if let Some(file) = &args.merge_output {
        options.push(with_stdout_or_err(open_sink(file)?));
    }
    // Last, so argv[0] reflects any --path.
    if !args.args.is_empty() {
        options.push(with_args(args.args.iter().cloned()));
    }

    Ok(options)
}

fn open_sink(file: &Path) -> anyhow::Result<OutputSink> {
    OutputSink::file(file).with_context(|| format!("Failed to open {} for writing", file.display()))
}

async fn run_command(profile: &Profile, args: RunArgs) -> anyhow::Result<i32> {
    let options = build_options(profile, &args)?;
    debug!(command = %args.command, options = options.len(), "Running command");

    let mut argv = vec![args.command.clone()];
    argv.extend(args.args.iter().cloned());
    let report = RunReport::start(args.command.clone(), argv);

    let result = Runner::new().run_async(args.command, options).await;
    let code = exit_status_of(&result);

    if args.json {
        let report = report.finish(&result);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Err(e) = &result {
        eprintln!("xrun: {}", e);
    }

    Ok(code)
}

fn write_profile_template(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        eprintln!("Error: profile already exists at {}", path.display());
        eprintln!("Use --force to overwrite it.");
        process::exit(1);
    }

    fs::write(path, PROFILE_TEMPLATE).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created profile template at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_run(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Run(args) => args,
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn test_parse_run_with_trailing_args() {
        let args = parse_run(&["xrun", "run", "-v", "--env", "A=1", "ls", "-la", "/tmp"]);
        assert!(args.verbose);
        assert_eq!(args.env, vec!["A=1"]);
        assert_eq!(args.command, "ls");
        assert_eq!(args.args, vec!["-la", "/tmp"]);
    }

    #[test]
    fn test_parse_rejects_bad_env_line() {
        assert!(Cli::try_parse_from(["xrun", "run", "--env", "NOEQ", "ls"]).is_err());
    }

    #[test]
    fn test_merge_output_conflicts_with_stdout() {
        let parsed = Cli::try_parse_from(["xrun", "run", "--stdout", "a", "--merge-output", "b", "ls"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_build_options_profile_first() {
        let profile = Profile {
            verbose: true,
            dir: Some(PathBuf::from("/profile")),
            ..Default::default()
        };
        let args = RunArgs {
            dir: Some(PathBuf::from("/flag")),
            command: "ls".to_string(),
            args: vec!["-l".to_string()],
            ..Default::default()
        };

        let options = build_options(&profile, &args).unwrap();
        assert_eq!(options.len(), 4);
        assert!(matches!(options[0], RunOption::Verbose));
        assert!(matches!(&options[1], RunOption::Dir(d) if d == Path::new("/profile")));
        assert!(matches!(&options[2], RunOption::Dir(d) if d == Path::new("/flag")));
        assert!(matches!(&options[3], RunOption::Args(a) if a == &["-l"]));
    }

    #[test]
    fn test_build_options_opens_output_files() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            merge_output: Some(dir.path().join("all.log")),
            command: "ls".to_string(),
            ..Default::default()
        };

        let options = build_options(&Profile::default(), &args).unwrap();
        assert!(matches!(options[0], RunOption::StdOutOrErr(_)));
        assert!(dir.path().join("all.log").exists());
    }

    #[test]
    fn test_parse_expand_requires_text() {
        assert!(Cli::try_parse_from(["xrun", "expand"]).is_err());

        let cli = Cli::try_parse_from(["xrun", "expand", "$HOME", "plain"]).unwrap();
        assert!(matches!(cli.command, Commands::Expand { texts } if texts == ["$HOME", "plain"]));
    }

    #[test]
    fn test_expand_texts_uses_given_environment() {
        let env = Environment::from_lines(["HOME=/users/test", "USER=tester"]);
        let texts = vec![
            "$HOME/bin".to_string(),
            "${USER}-x $MISSING".to_string(),
            "cost 5$".to_string(),
        ];

        let lines = expand_texts(&texts, &env).unwrap();
        assert_eq!(lines, vec!["/users/test/bin", "tester-x ", "cost 5$"]);
    }

    #[test]
    fn test_write_profile_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xrun.toml");
        write_profile_template(&path, false).unwrap();
        let written = Profile::load(&path).unwrap();
        assert_eq!(written, Profile::default());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_returns_child_status() {
        let args = RunArgs {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 5".to_string()],
            ..Default::default()
        };
        assert_eq!(run_command(&Profile::default(), args).await.unwrap(), 5);
    }
}

//! CLI command definitions and dispatch.

pub mod plan;
pub mod provision;

use std::path::{Path, PathBuf};

use anyhow::Context;
use berth_common::config::BerthConfig;
use berth_common::constants::CONFIG_ENV_VAR;
use berth_compose::environment::EnvironmentConfig;
use clap::{Parser, Subcommand, ValueEnum};

/// Berth: workspace environment orchestration.
#[derive(Parser, Debug)]
#[command(name = "berth", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the JSON host configuration.
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the launch order of an environment.
    Plan(plan::PlanArgs),
    /// Provision an environment and print the result.
    Provision(provision::ProvisionArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Plan(args) => plan::execute(&args),
        Command::Provision(args) => provision::execute(&args, cli.config.as_deref()),
    }
}

/// Reads an environment description from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid environment.
pub fn load_environment(path: &Path) -> anyhow::Result<EnvironmentConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read environment {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse environment {}", path.display()))
}

/// Loads the host configuration, falling back to defaults.
///
/// # Errors
///
/// Returns an error if the given file cannot be loaded.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BerthConfig> {
    match path {
        Some(path) => BerthConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => Ok(BerthConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use std::io::Write;

    use super::*;

    #[test]
    fn loads_environment_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"recipe": {{"type": "dockerimage", "location": "alpine"}}, "machines": {{"dev": {{}}}}}}"#
        )
        .unwrap();

        let env = load_environment(file.path()).expect("should load");
        assert_eq!(env.recipe.kind, "dockerimage");
        assert!(env.machines.contains_key("dev"));
    }

    #[test]
    fn missing_environment_file_names_path() {
        let err = load_environment(Path::new("/nonexistent/env.json")).unwrap_err();
        assert!(format!("{err}").contains("/nonexistent/env.json"));
    }

    #[test]
    fn plan_and_provision_run_on_environment_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"recipe": {{"type": "dockerimage", "location": "alpine"}}}}"#).unwrap();

        plan::execute(&plan::PlanArgs {
            file: file.path().to_path_buf(),
        })
        .expect("plan");
        provision::execute(
            &provision::ProvisionArgs {
                file: file.path().to_path_buf(),
                workspace: "ws1".into(),
                env: "default".into(),
                owner: "alice".into(),
            },
            None,
        )
        .expect("provision");
    }

    #[test]
    fn default_config_without_path() {
        let config = load_config(None).expect("defaults");
        assert_eq!(config, BerthConfig::default());
    }

    #[test]
    fn cli_parses_provision() {
        let cli = Cli::try_parse_from([
            "berth",
            "--log-format",
            "json",
            "provision",
            "env.json",
            "--workspace",
            "ws1",
            "--owner",
            "alice",
        ])
        .expect("should parse");
        assert_eq!(cli.log_format, LogFormat::Json);
        let Command::Provision(args) = cli.command else {
            panic!("expected provision");
        };
        assert_eq!(args.workspace, "ws1");
        assert_eq!(args.env, "default");
    }
}

//! `berth plan`: Show the weighted launch order of an environment.

use std::path::PathBuf;

use berth_compose::parser::parse_environment;
use berth_compose::strategy;
use clap::Args;

use crate::output::format_plan;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the JSON environment description.
    pub file: PathBuf,
}

/// Executes the `plan` command.
///
/// Parses the recipe, validates the dependency declarations, and prints
/// the launch batches with their weights.
///
/// # Errors
///
/// Returns an error if the environment cannot be read, parsed, or ordered.
pub fn execute(args: &PlanArgs) -> anyhow::Result<()> {
    let config = super::load_environment(&args.file)?;
    let environment = parse_environment(&config)?;
    let order = strategy::resolve(&environment)?;
    tracing::info!(file = %args.file.display(), containers = order.len(), "launch plan resolved");

    println!("Launch plan for: {}", args.file.display());
    println!();
    print!("{}", format_plan(&order, &environment));
    println!();
    println!("  {} container(s) will be launched.", order.len());
    Ok(())
}

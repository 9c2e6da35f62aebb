//! `berth provision`: Run the standard provisioner pipeline and print the
//! resulting internal environment.

use std::path::{Path, PathBuf};

use berth_common::types::RuntimeIdentity;
use berth_compose::parser::parse_environment;
use berth_provision::ProvisionerPipeline;
use clap::Args;

/// Arguments for the `provision` command.
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Path to the JSON environment description.
    pub file: PathBuf,

    /// Workspace identifier.
    #[arg(long)]
    pub workspace: String,

    /// Environment name.
    #[arg(long, default_value = "default")]
    pub env: String,

    /// Workspace owner.
    #[arg(long)]
    pub owner: String,
}

/// Executes the `provision` command.
///
/// # Errors
///
/// Returns an error if the configuration or environment cannot be loaded,
/// or if any provisioning stage fails.
pub fn execute(args: &ProvisionArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let settings = super::load_config(config_path)?;
    let config = super::load_environment(&args.file)?;
    let identity = RuntimeIdentity::new(&args.workspace, &args.env, &args.owner);

    let mut environment = parse_environment(&config)?;
    ProvisionerPipeline::standard(&settings).provision(&config, &mut environment, &identity)?;
    tracing::info!(
        file = %args.file.display(),
        %identity,
        containers = environment.len(),
        "environment provisioned"
    );

    println!("{}", serde_json::to_string_pretty(&environment)?);
    Ok(())
}

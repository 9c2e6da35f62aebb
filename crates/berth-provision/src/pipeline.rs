//! Provisioner capability and the fixed stage pipeline.

use berth_common::config::BerthConfig;
use berth_common::error::{BerthError, Result};
use berth_common::types::RuntimeIdentity;
use berth_compose::environment::EnvironmentConfig;
use berth_compose::model::{ContainerConfig, DockerEnvironment};

use crate::env_vars::{ApiEndpointEnvProvisioner, ToolingServerEnvProvisioner};
use crate::installer::InstallerConfigProvisioner;
use crate::labels::LabelsProvisioner;
use crate::settings::ContainerSystemSettingsProvisioner;
use crate::volumes::{ExcludeFoldersFromSnapshotProvisioner, ProjectsVolumeProvisioner};

/// One stage of the pipeline.
///
/// A stage only writes the fields it owns, and applying it again to an
/// already provisioned environment must not duplicate anything.
pub trait Provisioner: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Mutates `environment` for the runtime `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::Infrastructure`] when the environment cannot be
    /// provisioned.
    fn apply(
        &self,
        config: &EnvironmentConfig,
        environment: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<()>;
}

/// Stages applied in their composition order.
pub struct ProvisionerPipeline {
    stages: Vec<Box<dyn Provisioner>>,
}

impl ProvisionerPipeline {
    /// Creates a pipeline running `stages` in the given order.
    #[must_use]
    pub fn new(stages: Vec<Box<dyn Provisioner>>) -> Self {
        Self { stages }
    }

    /// The standard stage list configured from `config`.
    #[must_use]
    pub fn standard(config: &BerthConfig) -> Self {
        Self::new(vec![
            Box::new(ExcludeFoldersFromSnapshotProvisioner::new(config)),
            Box::new(InstallerConfigProvisioner),
            Box::new(ProjectsVolumeProvisioner::new(config)),
            Box::new(ContainerSystemSettingsProvisioner::new(config)),
            Box::new(LabelsProvisioner),
            Box::new(ApiEndpointEnvProvisioner::new(config)),
            Box::new(ToolingServerEnvProvisioner::new(config)),
        ])
    }

    /// Names of the stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Applies every stage in order, stopping at the first failure.
    ///
    /// Mutations of the stages that already ran are kept.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage.
    pub fn provision(
        &self,
        config: &EnvironmentConfig,
        environment: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<()> {
        for stage in &self.stages {
            tracing::debug!(stage = stage.name(), workspace_id = %identity.workspace_id, "applying provisioner");
            if let Err(e) = stage.apply(config, environment, identity) {
                tracing::warn!(stage = stage.name(), error = %e, "provisioning aborted");
                return Err(e);
            }
        }
        tracing::info!(
            workspace_id = %identity.workspace_id,
            containers = environment.len(),
            "environment provisioned"
        );
        Ok(())
    }
}

impl std::fmt::Debug for ProvisionerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionerPipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Looks up the container of a configured machine.
pub(crate) fn machine_container<'a>(
    environment: &'a mut DockerEnvironment,
    machine: &str,
) -> Result<&'a mut ContainerConfig> {
    environment
        .containers
        .get_mut(machine)
        .ok_or_else(|| BerthError::infrastructure(format!("machine '{machine}' is not found in environment")))
}

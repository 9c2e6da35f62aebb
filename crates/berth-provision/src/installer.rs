//! Installer configuration provisioner.
//!
//! Merges installer environment variables into their machine and exposes
//! the ports of every server the machine or its installers declare.

use berth_common::error::{BerthError, Result};
use berth_common::types::RuntimeIdentity;
use berth_compose::environment::EnvironmentConfig;
use berth_compose::model::{DockerEnvironment, push_unique};

use crate::pipeline::{Provisioner, machine_container};

/// Applies installers and servers of every configured machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallerConfigProvisioner;

impl Provisioner for InstallerConfigProvisioner {
    fn name(&self) -> &'static str {
        "installer-config"
    }

    fn apply(
        &self,
        config: &EnvironmentConfig,
        environment: &mut DockerEnvironment,
        _identity: &RuntimeIdentity,
    ) -> Result<()> {
        for (name, machine) in &config.machines {
            let container = machine_container(environment, name)?;

            // Values declared by the recipe win over installer defaults.
            for installer in &machine.installers {
                for (key, value) in &installer.env {
                    let _ = container
                        .environment
                        .entry(key.clone())
                        .or_insert_with(|| value.clone());
                }
            }

            for (reference, server) in machine.all_servers() {
                let port = server.exposed_port().ok_or_else(|| {
                    BerthError::infrastructure(format!(
                        "server '{reference}' of machine '{name}' has invalid port '{}'",
                        server.port
                    ))
                })?;
                let _ = push_unique(&mut container.expose, port);
            }
        }
        Ok(())
    }
}

//! Label provisioner.
//!
//! Writes the identity labels the runtime registry queries by, the machine
//! name, and one label group per server.

use berth_common::constants::{LABEL_MACHINE_NAME, LABEL_SERVER_PREFIX};
use berth_common::error::{BerthError, Result};
use berth_common::types::RuntimeIdentity;
use berth_compose::environment::EnvironmentConfig;
use berth_compose::model::DockerEnvironment;

use crate::pipeline::{Provisioner, machine_container};

/// Writes runtime, machine, and server labels. Touches nothing but labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelsProvisioner;

impl Provisioner for LabelsProvisioner {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn apply(
        &self,
        config: &EnvironmentConfig,
        environment: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<()> {
        let identity_labels = identity.to_labels();
        for (name, container) in &mut environment.containers {
            container.labels.extend(identity_labels.clone());
            container.set_label(LABEL_MACHINE_NAME, name.as_str());
        }

        for (name, machine) in &config.machines {
            let container = machine_container(environment, name)?;
            for (reference, server) in machine.all_servers() {
                let port = server.exposed_port().ok_or_else(|| {
                    BerthError::infrastructure(format!(
                        "server '{reference}' of machine '{name}' has invalid port '{}'",
                        server.port
                    ))
                })?;
                let prefix = format!("{LABEL_SERVER_PREFIX}.{reference}");
                container.set_label(format!("{prefix}.port"), port);
                if let Some(protocol) = &server.protocol {
                    container.set_label(format!("{prefix}.protocol"), protocol.as_str());
                }
                if let Some(path) = &server.path {
                    container.set_label(format!("{prefix}.path"), path.as_str());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use berth_common::constants::{LABEL_ENV_NAME, LABEL_OWNER, LABEL_WORKSPACE_ID};
    use berth_compose::environment::{MachineConfig, ServerConfig};
    use berth_compose::model::ContainerConfig;

    use super::*;

    #[test]
    fn writes_identity_machine_and_server_labels() {
        let identity = RuntimeIdentity::new("ws1", "default", "alice");
        let config = EnvironmentConfig {
            machines: BTreeMap::from([(
                "dev".into(),
                MachineConfig {
                    servers: BTreeMap::from([(
                        "ide".into(),
                        ServerConfig {
                            port: "8080".into(),
                            protocol: Some("http".into()),
                            path: Some("/ide".into()),
                        },
                    )]),
                    ..MachineConfig::default()
                },
            )]),
            ..EnvironmentConfig::default()
        };
        let mut env = DockerEnvironment::from_containers([
            ("dev", ContainerConfig::image("ide")),
            ("db", ContainerConfig::image("pg")),
        ]);

        LabelsProvisioner
            .apply(&config, &mut env, &identity)
            .expect("should apply");

        let dev = &env.containers["dev"].labels;
        assert_eq!(dev[LABEL_WORKSPACE_ID], "ws1");
        assert_eq!(dev[LABEL_ENV_NAME], "default");
        assert_eq!(dev[LABEL_OWNER], "alice");
        assert_eq!(dev[LABEL_MACHINE_NAME], "dev");
        assert_eq!(dev["berth.server.ide.port"], "8080/tcp");
        assert_eq!(dev["berth.server.ide.protocol"], "http");
        assert_eq!(dev["berth.server.ide.path"], "/ide");

        let db = &env.containers["db"].labels;
        assert_eq!(db.len(), 4);
        assert_eq!(db[LABEL_MACHINE_NAME], "db");
    }

    #[test]
    fn only_labels_change() {
        let identity = RuntimeIdentity::new("ws1", "default", "alice");
        let mut env = DockerEnvironment::from_containers([("db", ContainerConfig::image("pg"))]);
        LabelsProvisioner
            .apply(&EnvironmentConfig::default(), &mut env, &identity)
            .expect("should apply");

        let mut container = env.containers["db"].clone();
        container.labels.clear();
        assert_eq!(container, ContainerConfig::image("pg"));
        assert!(env.network.is_none());
    }
}

//! Volume provisioners: snapshot exclusions and the projects mount.

use std::path::PathBuf;

use berth_common::config::BerthConfig;
use berth_common::error::{BerthError, Result};
use berth_common::types::RuntimeIdentity;
use berth_compose::environment::EnvironmentConfig;
use berth_compose::model::{DockerEnvironment, push_unique};

use crate::pipeline::{Provisioner, machine_container};

/// Mounts excluded folders as anonymous volumes.
///
/// Committed container images do not include volume content, so these
/// folders never end up in a snapshot.
#[derive(Debug, Clone)]
pub struct ExcludeFoldersFromSnapshotProvisioner {
    folders: Vec<String>,
}

impl ExcludeFoldersFromSnapshotProvisioner {
    /// Reads the excluded folders from the configuration.
    #[must_use]
    pub fn new(config: &BerthConfig) -> Self {
        Self {
            folders: config.snapshot_exclude_folders.clone(),
        }
    }
}

impl Provisioner for ExcludeFoldersFromSnapshotProvisioner {
    fn name(&self) -> &'static str {
        "exclude-folders-from-snapshot"
    }

    fn apply(
        &self,
        _config: &EnvironmentConfig,
        environment: &mut DockerEnvironment,
        _identity: &RuntimeIdentity,
    ) -> Result<()> {
        if let Some(folder) = self.folders.iter().find(|f| !f.starts_with('/')) {
            return Err(BerthError::infrastructure(format!(
                "folder '{folder}' excluded from snapshots must be an absolute path"
            )));
        }
        for container in environment.containers.values_mut() {
            for folder in &self.folders {
                let _ = push_unique(&mut container.volumes, folder.as_str());
            }
        }
        Ok(())
    }
}

/// Bind-mounts the workspace projects folder into the dev machine.
#[derive(Debug, Clone)]
pub struct ProjectsVolumeProvisioner {
    projects_root: PathBuf,
    mount_path: String,
    selinux_relabel: bool,
}

impl ProjectsVolumeProvisioner {
    /// Reads the projects location from the configuration.
    #[must_use]
    pub fn new(config: &BerthConfig) -> Self {
        Self {
            projects_root: config.projects_root.clone(),
            mount_path: config.projects_mount_path.clone(),
            selinux_relabel: config.selinux_relabel,
        }
    }

    fn volume(&self, workspace_id: &str) -> String {
        let host = self.projects_root.join(workspace_id);
        let suffix = if self.selinux_relabel { ":Z" } else { "" };
        format!("{}:{}{suffix}", host.display(), self.mount_path)
    }
}

impl Provisioner for ProjectsVolumeProvisioner {
    fn name(&self) -> &'static str {
        "projects-volume"
    }

    fn apply(
        &self,
        config: &EnvironmentConfig,
        environment: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<()> {
        let Some(dev) = config.dev_machine() else {
            tracing::debug!("no dev machine, projects volume skipped");
            return Ok(());
        };
        let volume = self.volume(&identity.workspace_id);
        let container = machine_container(environment, dev)?;
        let _ = push_unique(&mut container.volumes, volume);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use berth_common::constants::TOOLING_SERVER_INSTALLER;
    use berth_compose::environment::{InstallerConfig, MachineConfig};
    use berth_compose::model::ContainerConfig;

    use super::*;

    fn identity() -> RuntimeIdentity {
        RuntimeIdentity::new("ws1", "default", "alice")
    }

    fn dev_config(machine: &str) -> EnvironmentConfig {
        EnvironmentConfig {
            machines: BTreeMap::from([(
                machine.into(),
                MachineConfig {
                    installers: vec![InstallerConfig {
                        id: TOOLING_SERVER_INSTALLER.into(),
                        ..InstallerConfig::default()
                    }],
                    ..MachineConfig::default()
                },
            )]),
            ..EnvironmentConfig::default()
        }
    }

    fn two_containers() -> DockerEnvironment {
        DockerEnvironment::from_containers([
            ("dev", ContainerConfig::image("ide")),
            ("db", ContainerConfig::image("postgres")),
        ])
    }

    #[test]
    fn excluded_folders_mount_once_on_every_container() {
        let provisioner = ExcludeFoldersFromSnapshotProvisioner::new(&BerthConfig {
            snapshot_exclude_folders: vec!["/tmp".into(), "/var/cache".into()],
            ..BerthConfig::default()
        });
        let mut env = two_containers();
        for _ in 0..2 {
            provisioner
                .apply(&EnvironmentConfig::default(), &mut env, &identity())
                .expect("should apply");
        }
        for container in env.containers.values() {
            assert_eq!(container.volumes, vec!["/tmp", "/var/cache"]);
        }
    }

    #[test]
    fn relative_excluded_folder_fails() {
        let provisioner = ExcludeFoldersFromSnapshotProvisioner::new(&BerthConfig {
            snapshot_exclude_folders: vec!["tmp".into()],
            ..BerthConfig::default()
        });
        let err = provisioner
            .apply(&EnvironmentConfig::default(), &mut two_containers(), &identity())
            .unwrap_err();
        assert!(matches!(err, BerthError::Infrastructure { .. }));
    }

    #[test]
    fn projects_volume_only_on_dev_machine() {
        let provisioner = ProjectsVolumeProvisioner::new(&BerthConfig {
            projects_root: PathBuf::from("/data/workspaces"),
            selinux_relabel: true,
            ..BerthConfig::default()
        });
        let mut env = two_containers();
        for _ in 0..2 {
            provisioner
                .apply(&dev_config("dev"), &mut env, &identity())
                .expect("should apply");
        }
        assert_eq!(
            env.containers["dev"].volumes,
            vec!["/data/workspaces/ws1:/projects:Z"]
        );
        assert!(env.containers["db"].volumes.is_empty());
    }

    #[test]
    fn projects_volume_skipped_without_dev_machine() {
        let provisioner = ProjectsVolumeProvisioner::new(&BerthConfig::default());
        let mut env = two_containers();
        provisioner
            .apply(&EnvironmentConfig::default(), &mut env, &identity())
            .expect("should apply");
        assert!(env.containers.values().all(|c| c.volumes.is_empty()));
    }

    #[test]
    fn projects_volume_fails_for_missing_dev_container() {
        let provisioner = ProjectsVolumeProvisioner::new(&BerthConfig::default());
        let err = provisioner
            .apply(&dev_config("ghost"), &mut two_containers(), &identity())
            .unwrap_err();
        assert!(err.to_string().contains("'ghost'"));
    }
}

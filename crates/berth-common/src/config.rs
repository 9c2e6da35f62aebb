//! Global configuration model for the berth orchestrator.
//!
//! Every field has a default so a partial JSON file is enough.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_API_ENDPOINT, DEFAULT_PROJECTS_MOUNT_PATH, DEFAULT_PROJECTS_ROOT};
use crate::error::{BerthError, Result};

/// Root configuration consumed by the provisioner stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BerthConfig {
    /// Public endpoint of the workspace API.
    pub api_endpoint: String,
    /// Host directory holding one projects folder per workspace.
    pub projects_root: PathBuf,
    /// Mount path of the projects folder inside the dev machine.
    pub projects_mount_path: String,
    /// Append `:Z` to bind mounts for SELinux hosts.
    pub selinux_relabel: bool,
    /// Folders mounted as anonymous volumes so snapshots skip them.
    pub snapshot_exclude_folders: Vec<String>,
    /// `host:ip` entries added to every container.
    pub extra_hosts: Vec<String>,
    /// DNS servers of every container.
    pub dns: Vec<String>,
    /// Memory swap limit in bytes, `-1` for unlimited.
    pub memory_swap: Option<i64>,
    /// Run every container in privileged mode.
    pub privileged: bool,
    /// Security options of every container.
    pub security_opt: Vec<String>,
    /// HTTP proxy exported to containers.
    pub http_proxy: Option<String>,
    /// HTTPS proxy exported to containers.
    pub https_proxy: Option<String>,
    /// Hosts bypassing the proxy.
    pub no_proxy: Option<String>,
    /// Networks every container joins besides the runtime network.
    pub additional_networks: Vec<String>,
    /// Java options of the tooling server.
    pub wsagent_java_opts: Option<String>,
    /// CORS origins accepted by the tooling server.
    pub wsagent_cors_allowed_origins: Option<String>,
}

impl Default for BerthConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_owned(),
            projects_root: PathBuf::from(DEFAULT_PROJECTS_ROOT),
            projects_mount_path: DEFAULT_PROJECTS_MOUNT_PATH.to_owned(),
            selinux_relabel: false,
            snapshot_exclude_folders: Vec::new(),
            extra_hosts: Vec::new(),
            dns: Vec::new(),
            memory_swap: None,
            privileged: false,
            security_opt: Vec::new(),
            http_proxy: None,
            https_proxy: None,
            no_proxy: None,
            additional_networks: Vec::new(),
            wsagent_java_opts: None,
            wsagent_cors_allowed_origins: None,
        }
    }
}

impl BerthConfig {
    /// Loads the configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| BerthError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::Config`] on the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !self.projects_mount_path.starts_with('/') {
            return Err(BerthError::Config {
                message: format!(
                    "projects_mount_path must be absolute, got '{}'",
                    self.projects_mount_path
                ),
            });
        }
        if let Some(host) = self.extra_hosts.iter().find(|h| !h.contains(':')) {
            return Err(BerthError::Config {
                message: format!("extra host '{host}' must have the form host:ip"),
            });
        }
        if let Some(swap) = self.memory_swap.filter(|s| *s < -1) {
            return Err(BerthError::Config {
                message: format!("memory_swap must be -1 or positive, got {swap}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"privileged": true, "dns": ["8.8.8.8"]}}"#).expect("write");

        let config = BerthConfig::load(file.path()).expect("should load");
        assert!(config.privileged);
        assert_eq!(config.dns, vec!["8.8.8.8"]);
        assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = BerthConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BerthError::Io { .. }), "got: {err}");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"privileged_mode": true}}"#).expect("write");
        let err = BerthConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, BerthError::Serialization { .. }), "got: {err}");
    }

    #[test]
    fn relative_mount_path_is_rejected() {
        let config = BerthConfig {
            projects_mount_path: "projects".into(),
            ..BerthConfig::default()
        };
        assert!(matches!(config.validate(), Err(BerthError::Config { .. })));
    }

    #[test]
    fn malformed_extra_host_is_rejected() {
        let config = BerthConfig {
            extra_hosts: vec!["nohost".into()],
            ..BerthConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("nohost"));
    }
}

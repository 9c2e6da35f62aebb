//! Environment variable provisioners for the API endpoint and the tooling
//! server.

use berth_common::config::BerthConfig;
use berth_common::constants::{
    ENV_API_ENDPOINT, ENV_WORKSPACE_ID, ENV_WSAGENT_CORS_ALLOWED_ORIGINS, ENV_WSAGENT_JAVA_OPTS,
};
use berth_common::error::{BerthError, Result};
use berth_common::types::RuntimeIdentity;
use berth_compose::environment::EnvironmentConfig;
use berth_compose::model::DockerEnvironment;

use crate::pipeline::{Provisioner, machine_container};

/// Tells every container where the workspace API lives.
#[derive(Debug, Clone)]
pub struct ApiEndpointEnvProvisioner {
    endpoint: String,
}

impl ApiEndpointEnvProvisioner {
    /// Reads the API endpoint from the configuration.
    #[must_use]
    pub fn new(config: &BerthConfig) -> Self {
        Self {
            endpoint: config.api_endpoint.clone(),
        }
    }
}

impl Provisioner for ApiEndpointEnvProvisioner {
    fn name(&self) -> &'static str {
        "api-env"
    }

    fn apply(
        &self,
        _config: &EnvironmentConfig,
        environment: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(BerthError::infrastructure(format!(
                "API endpoint '{}' is not an http(s) URL",
                self.endpoint
            )));
        }
        for container in environment.containers.values_mut() {
            container.set_env(ENV_API_ENDPOINT, self.endpoint.as_str());
            container.set_env(ENV_WORKSPACE_ID, identity.workspace_id.as_str());
        }
        Ok(())
    }
}

/// Passes tooling server settings to the dev machine.
#[derive(Debug, Clone)]
pub struct ToolingServerEnvProvisioner {
    java_opts: Option<String>,
    cors_allowed_origins: Option<String>,
}

impl ToolingServerEnvProvisioner {
    /// Reads the tooling server settings from the configuration.
    #[must_use]
    pub fn new(config: &BerthConfig) -> Self {
        Self {
            java_opts: config.wsagent_java_opts.clone(),
            cors_allowed_origins: config.wsagent_cors_allowed_origins.clone(),
        }
    }
}

impl Provisioner for ToolingServerEnvProvisioner {
    fn name(&self) -> &'static str {
        "tooling-server-env"
    }

    fn apply(
        &self,
        config: &EnvironmentConfig,
        environment: &mut DockerEnvironment,
        _identity: &RuntimeIdentity,
    ) -> Result<()> {
        let Some(dev) = config.dev_machine() else {
            return Ok(());
        };
        let container = machine_container(environment, dev)?;
        if let Some(opts) = &self.java_opts {
            container.set_env(ENV_WSAGENT_JAVA_OPTS, opts.as_str());
        }
        if let Some(origins) = &self.cors_allowed_origins {
            container.set_env(ENV_WSAGENT_CORS_ALLOWED_ORIGINS, origins.as_str());
        }
        Ok(())
    }
}

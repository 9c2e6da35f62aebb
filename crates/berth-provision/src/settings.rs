//! Host-wide container settings.
//!
//! Applies the same system settings to every container of the runtime and
//! attaches them to the runtime network.

use berth_common::config::BerthConfig;
use berth_common::error::Result;
use berth_common::types::RuntimeIdentity;
use berth_compose::environment::EnvironmentConfig;
use berth_compose::model::{ContainerConfig, DockerEnvironment, push_unique};

use crate::pipeline::Provisioner;

/// Extra hosts, DNS, memory swap, privileges, security options, proxies,
/// and networks.
#[derive(Debug, Clone)]
pub struct ContainerSystemSettingsProvisioner {
    extra_hosts: Vec<String>,
    dns: Vec<String>,
    memory_swap: Option<i64>,
    privileged: bool,
    security_opt: Vec<String>,
    proxy_env: Vec<(&'static str, String)>,
    additional_networks: Vec<String>,
}

impl ContainerSystemSettingsProvisioner {
    /// Reads the host-wide settings from the configuration.
    #[must_use]
    pub fn new(config: &BerthConfig) -> Self {
        let mut proxy_env = Vec::new();
        for (keys, value) in [
            (["HTTP_PROXY", "http_proxy"], &config.http_proxy),
            (["HTTPS_PROXY", "https_proxy"], &config.https_proxy),
            (["NO_PROXY", "no_proxy"], &config.no_proxy),
        ] {
            if let Some(value) = value {
                proxy_env.extend(keys.map(|key| (key, value.clone())));
            }
        }
        Self {
            extra_hosts: config.extra_hosts.clone(),
            dns: config.dns.clone(),
            memory_swap: config.memory_swap,
            privileged: config.privileged,
            security_opt: config.security_opt.clone(),
            proxy_env,
            additional_networks: config.additional_networks.clone(),
        }
    }

    fn apply_to(&self, container: &mut ContainerConfig) {
        for host in &self.extra_hosts {
            let _ = push_unique(&mut container.extra_hosts, host.as_str());
        }
        for server in &self.dns {
            let _ = push_unique(&mut container.dns, server.as_str());
        }
        if self.memory_swap.is_some() {
            container.memswap_limit = self.memory_swap;
        }
        if self.privileged {
            container.privileged = true;
        }
        for opt in &self.security_opt {
            let _ = push_unique(&mut container.security_opt, opt.as_str());
        }
        for (key, value) in &self.proxy_env {
            container.set_env(*key, value.as_str());
        }
        for network in &self.additional_networks {
            let _ = push_unique(&mut container.networks, network.as_str());
        }
    }
}

/// Name of the network shared by the containers of one runtime.
#[must_use]
pub fn runtime_network_name(identity: &RuntimeIdentity) -> String {
    format!("{}_{}", identity.workspace_id, identity.env_name)
}

impl Provisioner for ContainerSystemSettingsProvisioner {
    fn name(&self) -> &'static str {
        "container-system-settings"
    }

    fn apply(
        &self,
        _config: &EnvironmentConfig,
        environment: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<()> {
        if environment.network.is_none() {
            environment.network = Some(runtime_network_name(identity));
        }
        for container in environment.containers.values_mut() {
            self.apply_to(container);
        }
        Ok(())
    }
}

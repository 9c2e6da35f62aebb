//! Runtime lifecycle: provision, order, and launch an environment; tear it
//! down again by identity.

use std::collections::BTreeMap;
use std::sync::Arc;

use berth_common::error::{BerthError, Result};
use berth_common::types::{ContainerId, RuntimeIdentity};
use berth_compose::environment::EnvironmentConfig;
use berth_compose::model::{ContainerConfig, DockerEnvironment};
use berth_compose::parser::parse_environment;
use berth_compose::strategy::{self, StartupOrder};
use berth_provision::ProvisionerPipeline;
use berth_provision::settings::runtime_network_name;
use serde::Serialize;

use crate::engine::{ContainerEngine, CreateContainer};
use crate::registry::RuntimeContainers;

/// A container launched for one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchedContainer {
    /// Machine the container runs.
    pub machine: String,
    /// Engine identifier.
    pub id: ContainerId,
    /// Container name on the engine.
    pub name: String,
    /// Launch weight of the machine.
    pub weight: usize,
}

/// A runtime whose containers are all running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedRuntime {
    /// Runtime identity.
    pub identity: RuntimeIdentity,
    /// Network the containers were created in.
    pub network: Option<String>,
    /// Containers in launch order.
    pub containers: Vec<LaunchedContainer>,
}

/// Provisioned environment with its launch order, ready to start.
#[derive(Debug, Clone)]
pub struct PreparedEnvironment {
    /// Provisioned internal environment.
    pub environment: DockerEnvironment,
    /// Weighted launch order.
    pub order: StartupOrder,
}

/// Starts and stops workspace runtimes on a container engine.
pub struct Orchestrator {
    engine: Arc<dyn ContainerEngine>,
    pipeline: ProvisionerPipeline,
    registry: RuntimeContainers,
}

impl Orchestrator {
    /// Creates an orchestrator provisioning with `pipeline`.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>, pipeline: ProvisionerPipeline) -> Self {
        let registry = RuntimeContainers::new(Arc::clone(&engine));
        Self {
            engine,
            pipeline,
            registry,
        }
    }

    /// Registry over the same engine.
    #[must_use]
    pub const fn registry(&self) -> &RuntimeContainers {
        &self.registry
    }

    /// Parses, provisions, and orders an environment without touching the
    /// engine.
    ///
    /// # Errors
    ///
    /// Returns the first recipe, provisioning, or dependency error.
    pub fn prepare(
        &self,
        config: &EnvironmentConfig,
        identity: &RuntimeIdentity,
    ) -> Result<PreparedEnvironment> {
        let mut environment = parse_environment(config)?;
        self.pipeline.provision(config, &mut environment, identity)?;
        let order = strategy::resolve(&environment)?;
        Ok(PreparedEnvironment { environment, order })
    }

    /// Starts a runtime.
    ///
    /// Batches of equal weight are launched one after another, the
    /// containers of a batch concurrently. On any failure the containers
    /// launched so far are removed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the preparation error, or
    /// [`BerthError::InternalInfrastructure`] for engine failures.
    pub fn start(
        &self,
        config: &EnvironmentConfig,
        identity: &RuntimeIdentity,
    ) -> Result<StartedRuntime> {
        let PreparedEnvironment { environment, order } = self.prepare(config, identity)?;
        let names: BTreeMap<&str, String> = environment
            .containers
            .iter()
            .map(|(machine, container)| (machine.as_str(), container_name(identity, machine, container)))
            .collect();

        let network = environment.network.as_deref();
        let created_network = match network {
            Some(network) => self.ensure_network(network)?,
            None => false,
        };

        let mut launched = Vec::with_capacity(order.len());
        for batch in order.batches() {
            let results = std::thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|machine| {
                        let launch = Launch {
                            machine,
                            name: names.get(machine).cloned().unwrap_or_default(),
                            weight: order.weight(machine).unwrap_or_default(),
                            network,
                        };
                        let names = &names;
                        let environment = &environment;
                        scope.spawn(move || self.launch(&launch, environment, names))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|_| Err(BerthError::infrastructure("container launch thread panicked")))
                    })
                    .collect::<Vec<_>>()
            });

            let mut failure = None;
            for result in results {
                match result {
                    Ok(container) => launched.push(container),
                    Err(e) => {
                        let _ = failure.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = failure {
                tracing::error!(%identity, error = %e, "runtime start failed, cleaning up");
                self.rollback(&launched, network.filter(|_| created_network));
                return Err(e);
            }
        }

        tracing::info!(%identity, containers = launched.len(), "runtime started");
        Ok(StartedRuntime {
            identity: identity.clone(),
            network: network.map(str::to_owned),
            containers: launched,
        })
    }

    /// Stops a runtime by removing every container carrying its identity,
    /// exited ones included, and its network. Returns the number of removed
    /// containers.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::InternalInfrastructure`] if discovery or any
    /// removal fails. Removal continues past individual failures.
    pub fn stop(&self, identity: &RuntimeIdentity) -> Result<usize> {
        let containers = self.registry.find_all(identity)?;
        let mut failure = None;
        let mut removed = 0;
        for container in &containers {
            match self.engine.remove_container(&container.id) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(%identity, container = %container.name, error = %e, "failed to remove container");
                    let _ = failure.get_or_insert_with(|| {
                        BerthError::internal(format!("failed to remove container '{}'", container.name), e)
                    });
                }
            }
        }

        let network = runtime_network_name(identity);
        let exists = self
            .engine
            .network_exists(&network)
            .map_err(|e| BerthError::internal(format!("failed to inspect network '{network}'"), e))?;
        if exists && let Err(e) = self.engine.remove_network(&network) {
            tracing::warn!(%identity, %network, error = %e, "failed to remove network");
            let _ = failure.get_or_insert_with(|| {
                BerthError::internal(format!("failed to remove network '{network}'"), e)
            });
        }

        if let Some(e) = failure {
            return Err(e);
        }
        tracing::info!(%identity, removed, "runtime stopped");
        Ok(removed)
    }

    fn ensure_network(&self, network: &str) -> Result<bool> {
        let exists = self
            .engine
            .network_exists(network)
            .map_err(|e| BerthError::internal(format!("failed to inspect network '{network}'"), e))?;
        if exists {
            return Ok(false);
        }
        self.engine
            .create_network(network)
            .map_err(|e| BerthError::internal(format!("failed to create network '{network}'"), e))?;
        tracing::debug!(%network, "network created");
        Ok(true)
    }

    fn launch(
        &self,
        launch: &Launch<'_>,
        environment: &DockerEnvironment,
        names: &BTreeMap<&str, String>,
    ) -> Result<LaunchedContainer> {
        let machine = launch.machine;
        let config = environment
            .containers
            .get(machine)
            .ok_or_else(|| BerthError::infrastructure(format!("machine '{machine}' is not found in environment")))?;
        let spec = CreateContainer {
            name: launch.name.clone(),
            network: launch.network.map(str::to_owned),
            config: rewrite_references(config, names),
        };

        let id = self
            .engine
            .create_container(&spec)
            .map_err(|e| BerthError::internal(format!("failed to create container for machine '{machine}'"), e))?;

        let attached = spec
            .config
            .networks
            .iter()
            .filter(|network| Some(network.as_str()) != launch.network)
            .try_for_each(|network| {
                self.engine.connect_to_network(network, &id).map_err(|e| {
                    BerthError::internal(format!("failed to connect machine '{machine}' to network '{network}'"), e)
                })
            });
        let started = attached.and_then(|()| {
            self.engine
                .start_container(&id)
                .map_err(|e| BerthError::internal(format!("failed to start container for machine '{machine}'"), e))
        });
        if let Err(e) = started {
            if let Err(cleanup) = self.engine.remove_container(&id) {
                tracing::warn!(machine, error = %cleanup, "failed to remove container after failed start");
            }
            return Err(e);
        }

        tracing::info!(machine, container = %spec.name, weight = launch.weight, "container started");
        Ok(LaunchedContainer {
            machine: machine.to_owned(),
            id,
            name: spec.name,
            weight: launch.weight,
        })
    }

    fn rollback(&self, launched: &[LaunchedContainer], network: Option<&str>) {
        for container in launched.iter().rev() {
            if let Err(e) = self.engine.remove_container(&container.id) {
                tracing::warn!(container = %container.name, error = %e, "cleanup failed");
            }
        }
        if let Some(network) = network
            && let Err(e) = self.engine.remove_network(network)
        {
            tracing::warn!(%network, error = %e, "cleanup failed");
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

struct Launch<'a> {
    machine: &'a str,
    name: String,
    weight: usize,
    network: Option<&'a str>,
}

/// Engine name of the container running `machine`.
///
/// An explicit `container_name` wins over
/// `<workspace>_<env>_<machine>_<owner>`, which keeps the containers of two
/// environments of one workspace apart.
#[must_use]
pub fn container_name(identity: &RuntimeIdentity, machine: &str, container: &ContainerConfig) -> String {
    container
        .container_name
        .clone()
        .unwrap_or_else(|| format!(
            "{}_{}_{machine}_{}",
            identity.workspace_id, identity.env_name, identity.owner
        ))
}

/// Replaces machine names in `links` and `volumes_from` with container names.
///
/// A link without an alias keeps the machine name reachable as its alias.
fn rewrite_references(config: &ContainerConfig, names: &BTreeMap<&str, String>) -> ContainerConfig {
    let rename = |target: &str| names.get(target).cloned().unwrap_or_else(|| target.to_owned());
    let mut config = config.clone();
    config.links = config
        .links
        .iter()
        .map(|link| match link.split_once(':') {
            Some((target, alias)) => format!("{}:{alias}", rename(target)),
            None => format!("{}:{link}", rename(link)),
        })
        .collect();
    config.volumes_from = config
        .volumes_from
        .iter()
        .map(|source| match source.split_once(':') {
            Some((target, mode)) => format!("{}:{mode}", rename(target)),
            None => rename(source),
        })
        .collect();
    config
}

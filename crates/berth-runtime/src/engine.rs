//! Container engine abstraction.
//!
//! The orchestrator and the registry only talk to the engine through
//! [`ContainerEngine`]. Wire protocol, connection pooling, timeouts, and
//! retries belong to the implementation.

use std::collections::BTreeMap;

use berth_common::types::{ContainerId, ContainerState};
use berth_compose::model::ContainerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a container engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine cannot be reached.
    #[error("container engine is unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// A referenced object does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing object.
        kind: &'static str,
        /// Identifier of the missing object.
        id: String,
    },

    /// An object with the same name already exists.
    #[error("{kind} already exists: {id}")]
    Conflict {
        /// Type of the clashing object.
        kind: &'static str,
        /// Identifier of the clashing object.
        id: String,
    },

    /// Transport failure.
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for engine calls.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// A container as listed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    /// Engine-assigned identifier.
    pub id: ContainerId,
    /// Container name.
    pub name: String,
    /// Image the container runs.
    pub image: String,
    /// Labels attached at creation.
    pub labels: BTreeMap<String, String>,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Everything the engine needs to create one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContainer {
    /// Container name, unique on the engine.
    pub name: String,
    /// Network the container is created in.
    pub network: Option<String>,
    /// Provisioned configuration with references rewritten to container names.
    pub config: ContainerConfig,
}

/// Capability the orchestration logic needs from a container engine.
pub trait ContainerEngine: Send + Sync {
    /// Lists containers matching every filter.
    ///
    /// A filter is `key=value` (label equality) or `key` (label presence).
    /// Stopped containers are only listed when `all` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    fn list_containers(&self, filters: &[String], all: bool) -> EngineResult<Vec<ContainerDescriptor>>;

    /// Creates a container without starting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be created.
    fn create_container(&self, spec: &CreateContainer) -> EngineResult<ContainerId>;

    /// Starts a created container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or cannot start.
    fn start_container(&self, id: &ContainerId) -> EngineResult<()>;

    /// Force-removes a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or cannot be removed.
    fn remove_container(&self, id: &ContainerId) -> EngineResult<()>;

    /// Returns whether a network exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    fn network_exists(&self, name: &str) -> EngineResult<bool>;

    /// Creates a network.
    ///
    /// # Errors
    ///
    /// Returns an error if the network exists or cannot be created.
    fn create_network(&self, name: &str) -> EngineResult<()>;

    /// Attaches a container to an additional network.
    ///
    /// # Errors
    ///
    /// Returns an error if the network or container is unknown.
    fn connect_to_network(&self, network: &str, id: &ContainerId) -> EngineResult<()>;

    /// Removes a network.
    ///
    /// # Errors
    ///
    /// Returns an error if the network is unknown or cannot be removed.
    fn remove_network(&self, name: &str) -> EngineResult<()>;
}

/// Builds a label equality filter.
#[must_use]
pub fn label_filter(key: &str, value: &str) -> String {
    format!("{key}={value}")
}

/// Evaluates one list filter against container labels.
#[must_use]
pub fn matches_filter(filter: &str, labels: &BTreeMap<String, String>) -> bool {
    match filter.split_once('=') {
        Some((key, value)) => labels.get(key).is_some_and(|v| v == value),
        None => labels.contains_key(filter),
    }
}

//! Label-based discovery of running runtimes.
//!
//! Nothing is persisted locally: the engine is the source of truth, and the
//! identity labels written at provisioning time are the index.

use std::collections::BTreeSet;
use std::sync::Arc;

use berth_common::constants::{LABEL_ENV_NAME, LABEL_OWNER, LABEL_WORKSPACE_ID};
use berth_common::error::{BerthError, Result};
use berth_common::types::RuntimeIdentity;

use crate::engine::{ContainerDescriptor, ContainerEngine, label_filter};

/// Finds runtime containers by their identity labels.
#[derive(Clone)]
pub struct RuntimeContainers {
    engine: Arc<dyn ContainerEngine>,
}

impl RuntimeContainers {
    /// Creates a registry backed by `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    /// Non-stopped containers carrying exactly this identity.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::InternalInfrastructure`] if the engine cannot be
    /// queried.
    pub fn find(&self, identity: &RuntimeIdentity) -> Result<Vec<ContainerDescriptor>> {
        self.list(identity, false)
    }

    /// Containers carrying exactly this identity, stopped ones included.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::InternalInfrastructure`] if the engine cannot be
    /// queried.
    pub fn find_all(&self, identity: &RuntimeIdentity) -> Result<Vec<ContainerDescriptor>> {
        self.list(identity, true)
    }

    fn list(&self, identity: &RuntimeIdentity, all: bool) -> Result<Vec<ContainerDescriptor>> {
        let filters = vec![
            label_filter(LABEL_WORKSPACE_ID, &identity.workspace_id),
            label_filter(LABEL_ENV_NAME, &identity.env_name),
            label_filter(LABEL_OWNER, &identity.owner),
        ];
        let containers = self
            .engine
            .list_containers(&filters, all)
            .map_err(|e| BerthError::internal(format!("failed to list containers of runtime {identity}"), e))?;
        tracing::debug!(%identity, all, count = containers.len(), "runtime containers found");
        Ok(containers)
    }

    /// Distinct identities of every non-stopped runtime on the engine.
    ///
    /// Containers missing any of the identity labels are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::InternalInfrastructure`] if the engine cannot be
    /// queried.
    pub fn find_identities(&self) -> Result<BTreeSet<RuntimeIdentity>> {
        let filters = [LABEL_WORKSPACE_ID, LABEL_ENV_NAME, LABEL_OWNER].map(String::from);
        let containers = self
            .engine
            .list_containers(&filters, false)
            .map_err(|e| BerthError::internal("failed to list runtime containers", e))?;
        let identities: BTreeSet<_> = containers
            .iter()
            .filter_map(|container| RuntimeIdentity::from_labels(&container.labels))
            .collect();
        tracing::debug!(count = identities.len(), "runtime identities discovered");
        Ok(identities)
    }
}

impl std::fmt::Debug for RuntimeContainers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContainers").finish_non_exhaustive()
    }
}

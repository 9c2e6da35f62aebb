//! In-memory container engine.
//!
//! Keeps containers and networks in a mutex-guarded map. Used wherever the
//! orchestration logic has to run without a real engine.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use berth_common::types::{ContainerId, ContainerState};

use crate::engine::{
    ContainerDescriptor, ContainerEngine, CreateContainer, EngineError, EngineResult,
    matches_filter,
};

#[derive(Debug, Default)]
struct State {
    containers: BTreeMap<ContainerId, Stored>,
    networks: BTreeMap<String, BTreeSet<ContainerId>>,
    started: Vec<String>,
    failing_starts: BTreeSet<String>,
}

#[derive(Debug, Clone)]
struct Stored {
    descriptor: ContainerDescriptor,
    spec: Option<CreateContainer>,
}

/// Container engine living entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl InMemoryEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`EngineError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes starting the container with this name fail.
    pub fn fail_start_of(&self, name: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            let _ = state.failing_starts.insert(name.into());
        }
    }

    /// Registers a container directly, bypassing creation.
    pub fn insert_container(
        &self,
        name: impl Into<String>,
        labels: BTreeMap<String, String>,
        state: ContainerState,
    ) -> ContainerId {
        let id = ContainerId::generate();
        let descriptor = ContainerDescriptor {
            id: id.clone(),
            name: name.into(),
            image: String::new(),
            labels,
            state,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Ok(mut guard) = self.state.lock() {
            let _ = guard.containers.insert(
                id.clone(),
                Stored {
                    descriptor,
                    spec: None,
                },
            );
        }
        id
    }

    /// Moves a container to the exited state.
    pub fn stop_container(&self, id: &ContainerId) {
        if let Ok(mut state) = self.state.lock()
            && let Some(stored) = state.containers.get_mut(id)
        {
            stored.descriptor.state = ContainerState::Exited;
        }
    }

    /// Creation request of the container with this name.
    #[must_use]
    pub fn created(&self, name: &str) -> Option<CreateContainer> {
        let state = self.state.lock().ok()?;
        state
            .containers
            .values()
            .find(|stored| stored.descriptor.name == name)
            .and_then(|stored| stored.spec.clone())
    }

    /// Names of started containers in start order.
    #[must_use]
    pub fn start_log(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.started.clone())
            .unwrap_or_default()
    }

    /// Names of existing networks.
    #[must_use]
    pub fn networks(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.networks.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Members of a network.
    #[must_use]
    pub fn network_members(&self, network: &str) -> BTreeSet<ContainerId> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.networks.get(network).cloned())
            .unwrap_or_default()
    }

    /// Number of containers in any state.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.containers.len())
            .unwrap_or_default()
    }

    fn state(&self) -> EngineResult<MutexGuard<'_, State>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable {
                message: "connection refused".into(),
            });
        }
        self.state.lock().map_err(|_| EngineError::Unavailable {
            message: "engine state poisoned".into(),
        })
    }
}

impl ContainerEngine for InMemoryEngine {
    fn list_containers(&self, filters: &[String], all: bool) -> EngineResult<Vec<ContainerDescriptor>> {
        let state = self.state()?;
        Ok(state
            .containers
            .values()
            .map(|stored| &stored.descriptor)
            .filter(|descriptor| all || descriptor.state.is_live())
            .filter(|descriptor| {
                filters
                    .iter()
                    .all(|filter| matches_filter(filter, &descriptor.labels))
            })
            .cloned()
            .collect())
    }

    fn create_container(&self, spec: &CreateContainer) -> EngineResult<ContainerId> {
        let mut state = self.state()?;
        if state
            .containers
            .values()
            .any(|stored| stored.descriptor.name == spec.name)
        {
            return Err(EngineError::Conflict {
                kind: "container",
                id: spec.name.clone(),
            });
        }
        if let Some(network) = &spec.network
            && !state.networks.contains_key(network)
        {
            return Err(EngineError::NotFound {
                kind: "network",
                id: network.clone(),
            });
        }

        let id = ContainerId::generate();
        let descriptor = ContainerDescriptor {
            id: id.clone(),
            name: spec.name.clone(),
            image: spec.config.image.clone().unwrap_or_default(),
            labels: spec.config.labels.clone(),
            state: ContainerState::Created,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Some(members) = spec
            .network
            .as_ref()
            .and_then(|network| state.networks.get_mut(network))
        {
            let _ = members.insert(id.clone());
        }
        let _ = state.containers.insert(
            id.clone(),
            Stored {
                descriptor,
                spec: Some(spec.clone()),
            },
        );
        Ok(id)
    }

    fn start_container(&self, id: &ContainerId) -> EngineResult<()> {
        let mut state = self.state()?;
        let State {
            containers,
            started,
            failing_starts,
            ..
        } = &mut *state;
        let stored = containers.get_mut(id).ok_or_else(|| EngineError::NotFound {
            kind: "container",
            id: id.to_string(),
        })?;
        if failing_starts.contains(&stored.descriptor.name) {
            return Err(EngineError::Io(std::io::Error::other(format!(
                "container {} exited immediately",
                stored.descriptor.name
            ))));
        }
        stored.descriptor.state = ContainerState::Running;
        started.push(stored.descriptor.name.clone());
        Ok(())
    }

    fn remove_container(&self, id: &ContainerId) -> EngineResult<()> {
        let mut state = self.state()?;
        if state.containers.remove(id).is_none() {
            return Err(EngineError::NotFound {
                kind: "container",
                id: id.to_string(),
            });
        }
        for members in state.networks.values_mut() {
            let _ = members.remove(id);
        }
        Ok(())
    }

    fn network_exists(&self, name: &str) -> EngineResult<bool> {
        Ok(self.state()?.networks.contains_key(name))
    }

    fn create_network(&self, name: &str) -> EngineResult<()> {
        let mut state = self.state()?;
        if state.networks.contains_key(name) {
            return Err(EngineError::Conflict {
                kind: "network",
                id: name.to_owned(),
            });
        }
        let _ = state.networks.insert(name.to_owned(), BTreeSet::new());
        Ok(())
    }

    fn connect_to_network(&self, network: &str, id: &ContainerId) -> EngineResult<()> {
        let mut state = self.state()?;
        if !state.containers.contains_key(id) {
            return Err(EngineError::NotFound {
                kind: "container",
                id: id.to_string(),
            });
        }
        let members = state
            .networks
            .get_mut(network)
            .ok_or_else(|| EngineError::NotFound {
                kind: "network",
                id: network.to_owned(),
            })?;
        let _ = members.insert(id.clone());
        Ok(())
    }

    fn remove_network(&self, name: &str) -> EngineResult<()> {
        let mut state = self.state()?;
        state
            .networks
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound {
                kind: "network",
                id: name.to_owned(),
            })
    }
}

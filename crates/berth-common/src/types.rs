//! Domain primitive types used across the berth workspace.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{LABEL_ENV_NAME, LABEL_OWNER, LABEL_WORKSPACE_ID};

/// Unique identifier for a container assigned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of one logical workspace runtime.
///
/// Every container of the runtime carries the identity as labels, so the
/// engine itself is the index used to rediscover the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuntimeIdentity {
    /// Workspace the runtime belongs to.
    pub workspace_id: String,
    /// Environment of the workspace that is running.
    pub env_name: String,
    /// Owner of the workspace.
    pub owner: String,
}

impl RuntimeIdentity {
    /// Creates an identity from its three parts.
    #[must_use]
    pub fn new(
        workspace_id: impl Into<String>,
        env_name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            env_name: env_name.into(),
            owner: owner.into(),
        }
    }

    /// Returns the identity label set attached to every runtime container.
    #[must_use]
    pub fn to_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (LABEL_WORKSPACE_ID.to_owned(), self.workspace_id.clone()),
            (LABEL_ENV_NAME.to_owned(), self.env_name.clone()),
            (LABEL_OWNER.to_owned(), self.owner.clone()),
        ])
    }

    /// Reads an identity back from container labels.
    ///
    /// Returns `None` unless all three identity labels are present.
    #[must_use]
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Option<Self> {
        Some(Self {
            workspace_id: labels.get(LABEL_WORKSPACE_ID)?.clone(),
            env_name: labels.get(LABEL_ENV_NAME)?.clone(),
            owner: labels.get(LABEL_OWNER)?.clone(),
        })
    }
}

impl fmt::Display for RuntimeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.workspace_id, self.env_name, self.owner)
    }
}

/// Lifecycle state of a container as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Container has been created but not yet started.
    Created,
    /// Container is actively running.
    Running,
    /// Container has exited or was stopped.
    Exited,
}

impl ContainerState {
    /// Whether the engine reports this state in a non-`all` listing.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Exited => write!(f, "exited"),
        }
    }
}

/// Declaration a container dependency was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencySource {
    /// `depends_on` entry.
    DependsOn,
    /// `links` entry.
    Link,
    /// `volumes_from` entry.
    VolumesFrom,
}

impl DependencySource {
    /// Message fragment used when a container references itself.
    #[must_use]
    pub const fn self_reference_reason(self) -> &'static str {
        match self {
            Self::DependsOn => "cannot depend on itself",
            Self::Link => "cannot link to itself",
            Self::VolumesFrom => "cannot contain volumes_from to itself",
        }
    }
}

/// Field holding a `target[:suffix]` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `links`, suffix is an alias.
    Link,
    /// `volumes_from`, suffix is a mount mode.
    VolumesFrom,
}

impl From<ReferenceKind> for DependencySource {
    fn from(kind: ReferenceKind) -> Self {
        match kind {
            ReferenceKind::Link => Self::Link,
            ReferenceKind::VolumesFrom => Self::VolumesFrom,
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link => write!(f, "link"),
            Self::VolumesFrom => write!(f, "volumes_from"),
        }
    }
}

//! Unified error types for the berth workspace.
//!
//! Every library crate returns [`Result`]. Validation failures of the
//! environment description are reported before any container is launched;
//! infrastructure failures abort the current orchestration attempt.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{DependencySource, ReferenceKind};

/// Boxed error kept as the cause of an infrastructure failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum BerthError {
    /// A `links` or `volumes_from` entry has more than one separator.
    #[error("container '{container}' has a malformed entry: {kind} '{value}' is invalid")]
    InvalidReference {
        /// Container declaring the entry.
        container: String,
        /// Field the entry was declared in.
        kind: ReferenceKind,
        /// The raw entry.
        value: String,
    },

    /// A container declares a dependency on itself.
    #[error("container '{container}' {}", .via.self_reference_reason())]
    SelfDependency {
        /// Offending container.
        container: String,
        /// Declaration the self reference came from.
        via: DependencySource,
    },

    /// A dependency target is not a container of the environment.
    #[error("dependency '{dependency}' in container '{container}' points to unknown container")]
    UnknownDependency {
        /// Container declaring the dependency.
        container: String,
        /// The unresolvable target name.
        dependency: String,
    },

    /// Weight propagation stalled on a dependency cycle.
    #[error(
        "launch order of containers cannot be resolved, cyclic dependency between containers: {}",
        .containers.join(", ")
    )]
    Cycle {
        /// Containers left unresolved, sorted by name.
        containers: Vec<String>,
    },

    /// The environment description cannot be turned into containers.
    #[error("invalid environment: {message}")]
    InvalidEnvironment {
        /// Description of the problem.
        message: String,
    },

    /// A provisioning or launch step failed.
    #[error("infrastructure error: {message}")]
    Infrastructure {
        /// Description of the failure.
        message: String,
    },

    /// The container engine failed underneath an operation.
    #[error("internal infrastructure error: {message}: {source}")]
    InternalInfrastructure {
        /// Operation that was attempted.
        message: String,
        /// Underlying engine error.
        source: BoxError,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl BerthError {
    /// Builds an [`BerthError::Infrastructure`] from a message.
    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::Infrastructure {
            message: message.into(),
        }
    }

    /// Wraps an engine failure as [`BerthError::InternalInfrastructure`].
    pub fn internal(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::InternalInfrastructure {
            message: message.into(),
            source: Box::new(source),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BerthError>;

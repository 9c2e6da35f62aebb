//! Dependency graph management using `petgraph`.
//!
//! Builds a directed graph over container names from the three declared
//! dependency sources (`depends_on`, `links`, `volumes_from`), validating
//! every reference on the way in.

use std::collections::{BTreeMap, BTreeSet};

use berth_common::error::{BerthError, Result};
use berth_common::types::{DependencySource, ReferenceKind};
use petgraph::Direction;
use petgraph::graph::NodeIndex;

use crate::model::DockerEnvironment;

/// A dependency graph of containers.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Edges point from a dependency to its dependent.
    graph: petgraph::Graph<String, ()>,
    nodes: BTreeMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and validates the graph of an environment.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::InvalidReference`] for a `links`/`volumes_from`
    /// entry with more than one `:`, [`BerthError::SelfDependency`] for a
    /// container referencing itself, and [`BerthError::UnknownDependency`]
    /// for a reference to a container the environment does not declare.
    pub fn build(environment: &DockerEnvironment) -> Result<Self> {
        let mut graph = Self::new();
        for name in environment.containers.keys() {
            let _ = graph.add_container(name);
        }

        for (name, config) in &environment.containers {
            let mut targets = Vec::new();
            for dependency in &config.depends_on {
                targets.push((dependency.as_str(), DependencySource::DependsOn));
            }
            for (kind, entries) in [
                (ReferenceKind::Link, &config.links),
                (ReferenceKind::VolumesFrom, &config.volumes_from),
            ] {
                for entry in entries {
                    let target = parse_reference(name, kind, entry)?;
                    targets.push((target, kind.into()));
                }
            }

            for (target, via) in targets {
                if target == name.as_str() {
                    return Err(BerthError::SelfDependency {
                        container: name.clone(),
                        via,
                    });
                }
                if !environment.containers.contains_key(target) {
                    return Err(BerthError::UnknownDependency {
                        container: name.clone(),
                        dependency: target.to_owned(),
                    });
                }
                graph.add_dependency(name, target);
            }
        }

        Ok(graph)
    }

    /// Adds a container node, returning the existing node if present.
    pub fn add_container(&mut self, name: impl Into<String>) -> NodeIndex {
        let name = name.into();
        if let Some(&idx) = self.nodes.get(&name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        let _ = self.nodes.insert(name, idx);
        idx
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// Missing nodes are created. Repeated edges collapse into one.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) {
        let dependent = self.add_container(dependent);
        let dependency = self.add_container(dependency);
        let _ = self.graph.update_edge(dependency, dependent, ());
    }

    /// Names of all containers, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Number of containers in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the graph has no container.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct dependencies of a container; empty for unknown names.
    #[must_use]
    pub fn dependencies(&self, name: &str) -> BTreeSet<&str> {
        self.nodes.get(name).map_or_else(BTreeSet::new, |&idx| {
            self.graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|dep| self.graph[dep].as_str())
                .collect()
        })
    }

    /// Whether `dependent` needs `dependency` directly or through others.
    #[must_use]
    pub fn depends_transitively(&self, dependent: &str, dependency: &str) -> bool {
        match (self.nodes.get(dependent), self.nodes.get(dependency)) {
            (Some(&to), Some(&from)) if from != to => {
                petgraph::algo::has_path_connecting(&self.graph, from, to, None)
            }
            _ => false,
        }
    }
}

/// Extracts the container name from a `target[:suffix]` entry.
///
/// # Errors
///
/// Returns [`BerthError::InvalidReference`] if the entry holds more than one
/// `:` separator.
pub fn parse_reference<'a>(container: &str, kind: ReferenceKind, value: &'a str) -> Result<&'a str> {
    let mut parts = value.split(':');
    let target = parts.next().unwrap_or_default();
    let _suffix = parts.next();
    if parts.next().is_some() {
        return Err(BerthError::InvalidReference {
            container: container.to_owned(),
            kind,
            value: value.to_owned(),
        });
    }
    Ok(target)
}

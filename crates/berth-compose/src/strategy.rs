//! Startup order resolution.
//!
//! Every container gets a weight: 0 without dependencies, otherwise one more
//! than the heaviest of its direct dependencies. Weights are assigned by
//! repeated passes over the unresolved containers; a pass that resolves
//! nothing means the remaining containers sit on a cycle.
//!
//! Containers sharing a weight have no dependency edge between them. Their
//! relative order in [`StartupOrder::names`] is intentionally unspecified.

use std::collections::{BTreeMap, BTreeSet};

use berth_common::error::{BerthError, Result};

use crate::graph::DependencyGraph;
use crate::model::DockerEnvironment;

/// Containers of an environment in launch order, with their weights.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupOrder {
    entries: Vec<(String, usize)>,
}

impl StartupOrder {
    /// Container names in launch order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Consumes the order into the list of names.
    #[must_use]
    pub fn into_names(self) -> Vec<String> {
        self.entries.into_iter().map(|(name, _)| name).collect()
    }

    /// `(name, weight)` pairs in launch order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(name, weight)| (name.as_str(), *weight))
    }

    /// Weight of a container, if it belongs to the environment.
    #[must_use]
    pub fn weight(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, weight)| *weight)
    }

    /// Groups of equal weight in ascending weight order.
    ///
    /// Containers of one batch may be launched concurrently; a batch must
    /// not start before the previous one is ready.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<&str>> {
        let mut batches: Vec<Vec<&str>> = Vec::new();
        let mut current = None;
        for (name, weight) in self.iter() {
            if current != Some(weight) {
                batches.push(Vec::new());
                current = Some(weight);
            }
            if let Some(batch) = batches.last_mut() {
                batch.push(name);
            }
        }
        batches
    }

    /// Number of containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether there is nothing to launch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves the weighted launch order of an environment.
///
/// # Errors
///
/// Returns the validation errors of [`DependencyGraph::build`], or
/// [`BerthError::Cycle`] naming every container left unresolved.
pub fn resolve(environment: &DockerEnvironment) -> Result<StartupOrder> {
    let graph = DependencyGraph::build(environment)?;

    let mut unresolved: BTreeMap<&str, BTreeSet<&str>> = graph
        .names()
        .map(|name| (name, graph.dependencies(name)))
        .collect();
    let mut weights: BTreeMap<&str, usize> = BTreeMap::new();

    while !unresolved.is_empty() {
        let before = unresolved.len();
        unresolved.retain(|name, dependencies| match weight_of(dependencies, &weights) {
            Some(weight) => {
                let _ = weights.insert(*name, weight);
                false
            }
            None => true,
        });

        if unresolved.len() == before {
            let containers: Vec<String> = unresolved.keys().map(|&name| name.to_owned()).collect();
            tracing::warn!(?containers, "cyclic dependency between containers");
            return Err(BerthError::Cycle { containers });
        }
    }

    let mut entries: Vec<(String, usize)> = weights
        .into_iter()
        .map(|(name, weight)| (name.to_owned(), weight))
        .collect();
    entries.sort_by_key(|(_, weight)| *weight);

    let order = StartupOrder { entries };
    tracing::info!(order = ?order.names().collect::<Vec<_>>(), "startup order resolved");
    Ok(order)
}

/// Returns the launch order of an environment, lowest weight first.
///
/// # Errors
///
/// See [`resolve`].
pub fn order(environment: &DockerEnvironment) -> Result<Vec<String>> {
    resolve(environment).map(StartupOrder::into_names)
}

/// `None` until every dependency has a weight.
fn weight_of(dependencies: &BTreeSet<&str>, weights: &BTreeMap<&str, usize>) -> Option<usize> {
    dependencies
        .iter()
        .map(|dependency| weights.get(dependency).copied())
        .try_fold(0, |heaviest, weight| Some(heaviest.max(weight? + 1)))
}

//! Engine-shaped environment model.
//!
//! [`DockerEnvironment`] is what the provisioner stages mutate and what the
//! orchestrator turns into engine calls. Field names follow the compose file
//! format so a compose recipe deserializes straight into it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The containers of one workspace environment and their shared network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerEnvironment {
    /// Containers keyed by machine name.
    pub containers: BTreeMap<String, ContainerConfig>,
    /// Network all containers of the runtime join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

impl DockerEnvironment {
    /// Creates an environment from `(name, config)` pairs.
    pub fn from_containers<I, S>(containers: I) -> Self
    where
        I: IntoIterator<Item = (S, ContainerConfig)>,
        S: Into<String>,
    {
        Self {
            containers: containers
                .into_iter()
                .map(|(name, config)| (name.into(), config))
                .collect(),
            network: None,
        }
    }

    /// Returns the number of containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Returns whether the environment declares no container.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

/// Build instructions for a container without a prebuilt image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildContext {
    /// Build context location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Dockerfile path inside the context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
    /// Inline Dockerfile content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile_content: Option<String>,
    /// Build arguments.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}

/// One declared container.
///
/// The dependency fields (`depends_on`, `links`, `volumes_from`) are the only
/// ones the graph builder reads; everything else is passed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Image to run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Build instructions when no image is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildContext>,
    /// Explicit container name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    /// Command to run.
    #[serde(deserialize_with = "de::string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Entrypoint override.
    #[serde(deserialize_with = "de::string_or_list", skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
    /// Containers that must be launched first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// `target[:alias]` links.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    /// `target[:mode]` volume sources.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes_from: Vec<String>,
    /// Environment variables.
    #[serde(deserialize_with = "de::key_values", skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Container labels.
    #[serde(deserialize_with = "de::key_values", skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Ports exposed to other containers, `<port>/<transport>`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expose: Vec<String>,
    /// Ports published on the host.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Bind mounts and anonymous volumes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    /// Additional networks to join.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    /// `host:ip` entries for `/etc/hosts`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_hosts: Vec<String>,
    /// DNS servers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    /// Memory limit in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<i64>,
    /// Memory plus swap limit in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memswap_limit: Option<i64>,
    /// Privileged mode.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub privileged: bool,
    /// Security options.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_opt: Vec<String>,
}

impl ContainerConfig {
    /// Creates a config running the given image.
    #[must_use]
    pub fn image(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            ..Self::default()
        }
    }

    /// Adds a `depends_on` entry.
    #[must_use]
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Adds a `links` entry.
    #[must_use]
    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.links.push(link.into());
        self
    }

    /// Adds a `volumes_from` entry.
    #[must_use]
    pub fn volumes_from(mut self, source: impl Into<String>) -> Self {
        self.volumes_from.push(source.into());
        self
    }

    /// Sets an environment variable, replacing any previous value.
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.environment.insert(key.into(), value.into());
    }

    /// Sets a label, replacing any previous value.
    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.labels.insert(key.into(), value.into());
    }
}

/// Appends `value` unless the list already holds it.
///
/// Returns whether the list changed.
pub fn push_unique(list: &mut Vec<String>, value: impl Into<String>) -> bool {
    let value = value.into();
    if list.contains(&value) {
        return false;
    }
    list.push(value);
    true
}

mod de {
    //! Deserializers for the compose fields with more than one shape.

    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        String(String),
        List(Vec<String>),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Integer(i64),
        Float(f64),
        Bool(bool),
    }

    impl Scalar {
        fn into_string(self) -> String {
            match self {
                Self::String(s) => s,
                Self::Integer(n) => n.to_string(),
                Self::Float(f) => f.to_string(),
                Self::Bool(b) => b.to_string(),
            }
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum KeyValues {
        List(Vec<String>),
        Map(BTreeMap<String, Option<Scalar>>),
    }

    /// `command: "a b"` or `command: [a, b]`.
    pub(super) fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match StringOrList::deserialize(deserializer)? {
            StringOrList::String(s) => s.split_whitespace().map(str::to_owned).collect(),
            StringOrList::List(list) => list,
        })
    }

    /// `environment: [K=V]` or `environment: {K: V}`.
    pub(super) fn key_values<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match KeyValues::deserialize(deserializer)? {
            KeyValues::List(entries) => entries
                .into_iter()
                .map(|entry| match entry.split_once('=') {
                    Some((k, v)) => (k.to_owned(), v.to_owned()),
                    None => (entry, String::new()),
                })
                .collect(),
            KeyValues::Map(map) => map
                .into_iter()
                .map(|(k, v)| (k, v.map(Scalar::into_string).unwrap_or_default()))
                .collect(),
        })
    }
}

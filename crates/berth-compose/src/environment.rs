//! User-facing environment configuration.
//!
//! An environment is a recipe (compose file, image, or Dockerfile) plus
//! per-machine settings: installers, servers, and free-form attributes.

use std::collections::BTreeMap;

use berth_common::constants::TOOLING_SERVER_INSTALLER;
use serde::{Deserialize, Serialize};

/// Environment as submitted by the workspace owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Recipe describing the containers.
    pub recipe: Recipe,
    /// Per-machine settings keyed by machine name.
    #[serde(default)]
    pub machines: BTreeMap<String, MachineConfig>,
}

impl EnvironmentConfig {
    /// Name of the machine hosting the tooling server, if any.
    #[must_use]
    pub fn dev_machine(&self) -> Option<&str> {
        self.machines
            .iter()
            .find(|(_, machine)| machine.is_dev())
            .map(|(name, _)| name.as_str())
    }
}

/// Source of the environment's containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// `compose`, `dockerimage`, or `dockerfile`.
    #[serde(rename = "type")]
    pub kind: String,
    /// MIME type of the content.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Inline recipe content.
    #[serde(default)]
    pub content: Option<String>,
    /// Location of the recipe (image name or Dockerfile URL).
    #[serde(default)]
    pub location: Option<String>,
}

/// Settings of one machine of the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Installers to run inside the machine.
    pub installers: Vec<InstallerConfig>,
    /// Servers the machine exposes, keyed by server reference.
    pub servers: BTreeMap<String, ServerConfig>,
    /// Free-form attributes such as `memoryLimitBytes`.
    pub attributes: BTreeMap<String, String>,
}

impl MachineConfig {
    /// Whether the machine runs the tooling server.
    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.installers
            .iter()
            .any(|installer| installer.id == TOOLING_SERVER_INSTALLER)
    }

    /// Servers of the machine followed by the servers of its installers.
    ///
    /// A server declared by the machine wins over an installer server of the
    /// same reference.
    #[must_use]
    pub fn all_servers(&self) -> BTreeMap<&str, &ServerConfig> {
        let mut servers = BTreeMap::new();
        for installer in &self.installers {
            for (reference, server) in &installer.servers {
                let _ = servers.insert(reference.as_str(), server);
            }
        }
        for (reference, server) in &self.servers {
            let _ = servers.insert(reference.as_str(), server);
        }
        servers
    }
}

/// An installer and what it contributes to its machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerConfig {
    /// Installer identifier.
    pub id: String,
    /// Environment variables the installer requires.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Servers the installer starts.
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

/// A server listening inside a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `<port>` or `<port>/<transport>`.
    pub port: String,
    /// Application protocol, e.g. `http`.
    #[serde(default)]
    pub protocol: Option<String>,
    /// Path of the server root.
    #[serde(default)]
    pub path: Option<String>,
}

impl ServerConfig {
    /// Returns the port in `<port>/<transport>` form, defaulting to tcp.
    ///
    /// Returns `None` if the port is not a number in `1..=65535` or the
    /// transport is neither `tcp` nor `udp`.
    #[must_use]
    pub fn exposed_port(&self) -> Option<String> {
        let (number, transport) = self
            .port
            .split_once('/')
            .unwrap_or((self.port.as_str(), "tcp"));
        let number: u16 = number.parse().ok().filter(|n| *n != 0)?;
        matches!(transport, "tcp" | "udp").then(|| format!("{number}/{transport}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(port: &str) -> ServerConfig {
        ServerConfig {
            port: port.into(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn exposed_port_defaults_to_tcp() {
        assert_eq!(server("8080").exposed_port().as_deref(), Some("8080/tcp"));
        assert_eq!(server("53/udp").exposed_port().as_deref(), Some("53/udp"));
    }

    #[test]
    fn exposed_port_rejects_garbage() {
        assert_eq!(server("http").exposed_port(), None);
        assert_eq!(server("0").exposed_port(), None);
        assert_eq!(server("70000").exposed_port(), None);
        assert_eq!(server("80/sctp").exposed_port(), None);
    }

    #[test]
    fn machine_servers_override_installer_servers() {
        let machine = MachineConfig {
            installers: vec![InstallerConfig {
                id: "exec".into(),
                servers: BTreeMap::from([
                    ("exec".into(), server("4412")),
                    ("terminal".into(), server("4411")),
                ]),
                ..InstallerConfig::default()
            }],
            servers: BTreeMap::from([("exec".into(), server("5000"))]),
            ..MachineConfig::default()
        };
        let servers = machine.all_servers();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers["exec"].port, "5000");
        assert_eq!(servers["terminal"].port, "4411");
    }

    #[test]
    fn dev_machine_is_the_one_with_tooling_installer() {
        let config = EnvironmentConfig {
            machines: BTreeMap::from([
                ("db".into(), MachineConfig::default()),
                (
                    "ide".into(),
                    MachineConfig {
                        installers: vec![InstallerConfig {
                            id: TOOLING_SERVER_INSTALLER.into(),
                            ..InstallerConfig::default()
                        }],
                        ..MachineConfig::default()
                    },
                ),
            ]),
            ..EnvironmentConfig::default()
        };
        assert_eq!(config.dev_machine(), Some("ide"));
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{
            "recipe": {"type": "dockerimage", "location": "alpine:3"},
            "machines": {"dev": {"attributes": {"memoryLimitBytes": "1024"}}}
        }"#;
        let config: EnvironmentConfig = serde_json::from_str(json).expect("should parse");
        assert_eq!(config.recipe.kind, "dockerimage");
        assert_eq!(config.machines["dev"].attributes["memoryLimitBytes"], "1024");
    }
}

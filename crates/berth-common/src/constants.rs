//! Label schema, environment variable names, and defaults.
//!
//! The identity label keys are a versioned contract with every container
//! already running: renaming them breaks rediscovery of existing runtimes.

/// Label carrying the workspace id of a runtime container.
pub const LABEL_WORKSPACE_ID: &str = "berth.workspace.id";
/// Label carrying the environment name of a runtime container.
pub const LABEL_ENV_NAME: &str = "berth.env.name";
/// Label carrying the owner of a runtime container.
pub const LABEL_OWNER: &str = "berth.owner";
/// Label carrying the machine name a container was declared under.
pub const LABEL_MACHINE_NAME: &str = "berth.machine.name";
/// Prefix of the per-server labels (`berth.server.<ref>.port` etc.).
pub const LABEL_SERVER_PREFIX: &str = "berth.server";

/// Installer id marking a machine as the dev machine.
pub const TOOLING_SERVER_INSTALLER: &str = "berth.ws-agent";

/// API endpoint injected into every container.
pub const ENV_API_ENDPOINT: &str = "BERTH_API_ENDPOINT";
/// Workspace id injected into every container.
pub const ENV_WORKSPACE_ID: &str = "BERTH_WORKSPACE_ID";
/// Java options of the tooling server.
pub const ENV_WSAGENT_JAVA_OPTS: &str = "BERTH_WSAGENT_JAVA_OPTS";
/// CORS origins accepted by the tooling server.
pub const ENV_WSAGENT_CORS_ALLOWED_ORIGINS: &str = "BERTH_WSAGENT_CORS_ALLOWED_ORIGINS";

/// Machine name used by single-container recipes with no configured machine.
pub const DEFAULT_MACHINE_NAME: &str = "dev-machine";
/// Machine attribute overriding the container memory limit.
pub const MEMORY_LIMIT_ATTRIBUTE: &str = "memoryLimitBytes";

/// Default API endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:8080/api";
/// Default host directory holding workspace projects.
pub const DEFAULT_PROJECTS_ROOT: &str = "/var/lib/berth/workspaces";
/// Default mount path of the projects volume inside the dev machine.
pub const DEFAULT_PROJECTS_MOUNT_PATH: &str = "/projects";

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "BERTH_CONFIG";

/// Application name used in CLI output.
pub const APP_NAME: &str = "berth";

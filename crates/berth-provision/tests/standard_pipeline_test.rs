//! Integration tests for the standard provisioner pipeline.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use berth_common::config::BerthConfig;
use berth_common::constants::{
    ENV_API_ENDPOINT, ENV_WSAGENT_JAVA_OPTS, LABEL_OWNER, TOOLING_SERVER_INSTALLER,
};
use berth_common::types::RuntimeIdentity;
use berth_compose::environment::{EnvironmentConfig, InstallerConfig, MachineConfig, Recipe, ServerConfig};
use berth_compose::parser::parse_environment;
use berth_provision::ProvisionerPipeline;

const COMPOSE: &str = r"
services:
  dev:
    image: berth/ide
    depends_on: [db]
  db:
    image: postgres:15
";

fn environment_config() -> EnvironmentConfig {
    EnvironmentConfig {
        recipe: Recipe {
            kind: "compose".into(),
            content: Some(COMPOSE.into()),
            ..Recipe::default()
        },
        machines: BTreeMap::from([(
            "dev".into(),
            MachineConfig {
                installers: vec![InstallerConfig {
                    id: TOOLING_SERVER_INSTALLER.into(),
                    env: BTreeMap::from([("WSAGENT_PORT".into(), "4401".into())]),
                    servers: BTreeMap::from([(
                        "wsagent".into(),
                        ServerConfig {
                            port: "4401/tcp".into(),
                            protocol: Some("http".into()),
                            path: Some("/api".into()),
                        },
                    )]),
                }],
                ..MachineConfig::default()
            },
        )]),
    }
}

fn settings() -> BerthConfig {
    BerthConfig {
        projects_root: PathBuf::from("/srv/projects"),
        snapshot_exclude_folders: vec!["/tmp".into()],
        extra_hosts: vec!["git:10.0.0.7".into()],
        wsagent_java_opts: Some("-Xmx512m".into()),
        ..BerthConfig::default()
    }
}

#[test]
fn standard_pipeline_provisions_compose_environment() {
    let config = environment_config();
    let identity = RuntimeIdentity::new("ws42", "default", "bob");
    let mut env = parse_environment(&config).expect("parse");

    ProvisionerPipeline::standard(&settings())
        .provision(&config, &mut env, &identity)
        .expect("provision");

    let dev = &env.containers["dev"];
    assert_eq!(dev.volumes, vec!["/tmp", "/srv/projects/ws42:/projects"]);
    assert_eq!(dev.expose, vec!["4401/tcp"]);
    assert_eq!(dev.environment["WSAGENT_PORT"], "4401");
    assert_eq!(dev.environment[ENV_WSAGENT_JAVA_OPTS], "-Xmx512m");
    assert_eq!(dev.labels["berth.server.wsagent.port"], "4401/tcp");
    assert_eq!(dev.extra_hosts, vec!["git:10.0.0.7"]);

    let db = &env.containers["db"];
    assert_eq!(db.volumes, vec!["/tmp"]);
    assert_eq!(db.labels[LABEL_OWNER], "bob");
    assert!(db.environment.contains_key(ENV_API_ENDPOINT));
    assert!(!db.environment.contains_key(ENV_WSAGENT_JAVA_OPTS));

    assert_eq!(env.network.as_deref(), Some("ws42_default"));
}

#[test]
fn standard_pipeline_is_idempotent() {
    let config = environment_config();
    let identity = RuntimeIdentity::new("ws42", "default", "bob");
    let pipeline = ProvisionerPipeline::standard(&settings());

    let mut once = parse_environment(&config).expect("parse");
    pipeline.provision(&config, &mut once, &identity).expect("first");

    let mut twice = once.clone();
    pipeline.provision(&config, &mut twice, &identity).expect("second");

    assert_eq!(once, twice);
}

#[test]
fn failing_stage_leaves_later_stages_unapplied() {
    let config = environment_config();
    let identity = RuntimeIdentity::new("ws42", "default", "bob");
    let broken = BerthConfig {
        api_endpoint: "not-a-url".into(),
        ..settings()
    };
    let mut env = parse_environment(&config).expect("parse");

    let err = ProvisionerPipeline::standard(&broken)
        .provision(&config, &mut env, &identity)
        .unwrap_err();

    assert!(err.to_string().contains("not-a-url"));
    let dev = &env.containers["dev"];
    assert_eq!(dev.labels[LABEL_OWNER], "bob", "labels ran before the failure");
    assert!(!dev.environment.contains_key(ENV_WSAGENT_JAVA_OPTS));
}

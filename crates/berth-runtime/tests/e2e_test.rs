//! End-to-end tests of the runtime lifecycle against the in-memory engine.
//!
//! These tests drive the whole pipeline:
//! 1. Parse a compose recipe
//! 2. Provision it with the standard stages
//! 3. Resolve launch weights
//! 4. Launch batches on the engine
//! 5. Rediscover and stop runtimes by their labels

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::collections::BTreeSet;
use std::sync::Arc;

use berth_common::config::BerthConfig;
use berth_common::constants::{LABEL_MACHINE_NAME, LABEL_WORKSPACE_ID};
use berth_common::error::BerthError;
use berth_common::types::RuntimeIdentity;
use berth_compose::environment::{EnvironmentConfig, Recipe};
use berth_provision::ProvisionerPipeline;
use berth_runtime::{ContainerEngine, InMemoryEngine, Orchestrator};

const SHOP: &str = r"
services:
  db:
    image: postgres:15
  cache:
    image: redis:7
  web:
    image: shop/web
    depends_on: [db, cache]
    links: [db]
  worker:
    image: shop/worker
    depends_on: [web]
    volumes_from: ['web:ro']
";

fn compose(content: &str) -> EnvironmentConfig {
    EnvironmentConfig {
        recipe: Recipe {
            kind: "compose".into(),
            content: Some(content.into()),
            ..Recipe::default()
        },
        ..EnvironmentConfig::default()
    }
}

fn setup() -> (Arc<InMemoryEngine>, Orchestrator) {
    let engine = Arc::new(InMemoryEngine::new());
    let orchestrator = Orchestrator::new(
        engine.clone(),
        ProvisionerPipeline::standard(&BerthConfig::default()),
    );
    (engine, orchestrator)
}

fn alice() -> RuntimeIdentity {
    RuntimeIdentity::new("ws1", "default", "alice")
}

// ── Start ────────────────────────────────────────────────────────────

#[test]
fn start_launches_batches_in_weight_order() {
    let (engine, orchestrator) = setup();
    let runtime = orchestrator.start(&compose(SHOP), &alice()).expect("should start");

    assert_eq!(runtime.containers.len(), 4);
    assert_eq!(runtime.network.as_deref(), Some("ws1_default"));
    assert_eq!(engine.networks(), vec!["ws1_default"]);

    let log = engine.start_log();
    let first: BTreeSet<_> = log[..2].iter().map(String::as_str).collect();
    assert_eq!(first, BTreeSet::from(["ws1_default_cache_alice", "ws1_default_db_alice"]));
    assert_eq!(log[2], "ws1_default_web_alice");
    assert_eq!(log[3], "ws1_default_worker_alice");

    let weights: Vec<_> = runtime
        .containers
        .iter()
        .map(|c| (c.machine.as_str(), c.weight))
        .collect();
    assert_eq!(weights[2..], [("web", 1), ("worker", 2)]);
}

#[test]
fn start_rewrites_references_and_labels_containers() {
    let (engine, orchestrator) = setup();
    let _ = orchestrator.start(&compose(SHOP), &alice()).expect("should start");

    let web = engine.created("ws1_default_web_alice").expect("web created");
    assert_eq!(web.network.as_deref(), Some("ws1_default"));
    assert_eq!(web.config.links, vec!["ws1_default_db_alice:db"]);
    assert_eq!(web.config.labels[LABEL_WORKSPACE_ID], "ws1");
    assert_eq!(web.config.labels[LABEL_MACHINE_NAME], "web");

    let worker = engine.created("ws1_default_worker_alice").expect("worker created");
    assert_eq!(worker.config.volumes_from, vec!["ws1_default_web_alice:ro"]);
}

#[test]
fn failed_start_removes_launched_containers() {
    let (engine, orchestrator) = setup();
    engine.fail_start_of("ws1_default_web_alice");

    let err = orchestrator.start(&compose(SHOP), &alice()).unwrap_err();
    assert!(matches!(err, BerthError::InternalInfrastructure { .. }), "got: {err}");
    assert!(err.to_string().contains("'web'"), "got: {err}");

    assert_eq!(engine.container_count(), 0);
    assert!(engine.networks().is_empty());
    assert!(!engine.start_log().contains(&"ws1_default_worker_alice".to_owned()));
}

#[test]
fn cycle_fails_before_touching_engine() {
    let (engine, orchestrator) = setup();
    let recipe = r"
services:
  a:
    image: x
    depends_on: [b]
  b:
    image: x
    depends_on: [a]
";
    let err = orchestrator.start(&compose(recipe), &alice()).unwrap_err();
    match err {
        BerthError::Cycle { containers } => assert_eq!(containers, vec!["a", "b"]),
        other => panic!("expected cycle, got {other}"),
    }
    assert_eq!(engine.container_count(), 0);
    assert!(engine.networks().is_empty());
}

#[test]
fn unavailable_engine_is_internal_infrastructure() {
    let (engine, orchestrator) = setup();
    engine.set_unavailable(true);
    let err = orchestrator.start(&compose(SHOP), &alice()).unwrap_err();
    assert!(matches!(err, BerthError::InternalInfrastructure { .. }), "got: {err}");
}

// ── Discovery and stop ───────────────────────────────────────────────

#[test]
fn runtimes_are_rediscovered_by_labels() {
    let (_, orchestrator) = setup();
    let bob = RuntimeIdentity::new("ws2", "default", "bob");
    let _ = orchestrator.start(&compose(SHOP), &alice()).expect("alice");
    let _ = orchestrator.start(&compose(SHOP), &bob).expect("bob");

    let identities = orchestrator.registry().find_identities().expect("should list");
    assert_eq!(identities, BTreeSet::from([alice(), bob.clone()]));
    assert_eq!(orchestrator.registry().find(&bob).expect("should list").len(), 4);
}

#[test]
fn stop_removes_runtime_only() {
    let (engine, orchestrator) = setup();
    let bob = RuntimeIdentity::new("ws2", "default", "bob");
    let _ = orchestrator.start(&compose(SHOP), &alice()).expect("alice");
    let _ = orchestrator.start(&compose(SHOP), &bob).expect("bob");

    assert_eq!(orchestrator.stop(&alice()).expect("should stop"), 4);
    assert_eq!(engine.container_count(), 4);
    assert_eq!(engine.networks(), vec!["ws2_default"]);
    assert_eq!(
        orchestrator.registry().find_identities().expect("should list"),
        BTreeSet::from([bob])
    );
    assert_eq!(orchestrator.stop(&alice()).expect("nothing left"), 0);
}

#[test]
fn stop_removes_exited_containers_so_runtime_can_restart() {
    let (engine, orchestrator) = setup();
    let _ = orchestrator.start(&compose(SHOP), &alice()).expect("should start");
    let db = engine
        .list_containers(&[], true)
        .expect("should list")
        .into_iter()
        .find(|c| c.name == "ws1_default_db_alice")
        .expect("db exists");
    engine.stop_container(&db.id);

    assert_eq!(orchestrator.stop(&alice()).expect("should stop"), 4);
    assert_eq!(engine.container_count(), 0);
    assert!(engine.networks().is_empty());

    let restarted = orchestrator.start(&compose(SHOP), &alice()).expect("should restart");
    assert_eq!(restarted.containers.len(), 4);
}

#[test]
fn environments_of_one_workspace_coexist() {
    let (engine, orchestrator) = setup();
    let staging = RuntimeIdentity::new("ws1", "staging", "alice");
    let _ = orchestrator.start(&compose(SHOP), &alice()).expect("default");
    let _ = orchestrator.start(&compose(SHOP), &staging).expect("staging");

    assert_eq!(engine.container_count(), 8);
    assert!(engine.created("ws1_staging_db_alice").is_some());
    assert_eq!(orchestrator.registry().find(&staging).expect("should list").len(), 4);
}

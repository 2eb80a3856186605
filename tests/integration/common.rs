//! Shared test context and a simulated Redis operator.
//!
//! Every test gets its own in-memory store and its own suite, so tests can
//! run in parallel.  The simulated reconciler watches the store's change
//! feed and, some time after a declaration appears, writes the StatefulSet
//! and Services the real operator would derive.  Deleting the declaration
//! makes it remove them again, standing in for the garbage collector.
//!
//! Tests run on a paused tokio clock, so reconciler delays and poll
//! timeouts cost no wall-clock time and elapsed-time assertions are exact.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use kube::api::DynamicObject;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use redis_operator_harness::config::HarnessConfig;
use redis_operator_harness::crd::redis::Redis;
use redis_operator_harness::crd::redis_replication::RedisReplication;
use redis_operator_harness::crd::Declaration;
use redis_operator_harness::harness::{DerivedResource, Suite};
use redis_operator_harness::helpers::{headless_service_name, redis_labels, SetupMode};
use redis_operator_harness::store::{from_dynamic, InMemoryStore, ObjectKey, StoreEvent};

pub const TIMEOUT: Duration = Duration::from_secs(10);
pub const POLL: Duration = Duration::from_millis(250);
/// How long the simulated operator takes to react to a change.
pub const RECONCILE_DELAY: Duration = Duration::from_secs(2);
pub const NS: &str = "redis-e2e";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn,redis_operator_harness=debug"))
        .with_test_writer()
        .try_init();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Simulated reconciler
// ═══════════════════════════════════════════════════════════════════════════════

/// How the simulated operator misbehaves, if at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behaviour {
    /// Derives and reclaims everything correctly.
    Healthy,
    /// Never derives anything.
    Stalled,
    /// Puts one label too many on the StatefulSet.
    ExtraWorkloadLabel,
    /// Leaves the StatefulSet behind when the declaration is deleted.
    OrphansWorkload,
}

/// Spawn the reconciler.  The subscription is taken before returning so no
/// declaration submitted afterwards can be missed.
pub fn spawn_reconciler(store: InMemoryStore, behaviour: Behaviour) -> JoinHandle<()> {
    let mut events = store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(StoreEvent::Created(key)) if is_declaration(&key) => {
                    if behaviour == Behaviour::Stalled {
                        continue;
                    }
                    let Some(decl) = store.lookup(&key) else { continue };
                    let store = store.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(RECONCILE_DELAY).await;
                        derive(&store, &key, decl, behaviour);
                    });
                }
                Ok(StoreEvent::Deleted(key)) if is_declaration(&key) => {
                    let store = store.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(RECONCILE_DELAY).await;
                        reclaim(&store, &key, behaviour);
                    });
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn is_declaration(key: &ObjectKey) -> bool {
    key.kind == "Redis" || key.kind == "RedisReplication"
}

fn mode_and_replicas(key: &ObjectKey, decl: DynamicObject) -> Option<(SetupMode, i32)> {
    match key.kind.as_str() {
        "Redis" => from_dynamic::<Redis>(decl)
            .ok()
            .map(|d| (d.setup_mode(), d.expected_replicas())),
        "RedisReplication" => from_dynamic::<RedisReplication>(decl)
            .ok()
            .map(|d| (d.setup_mode(), d.expected_replicas())),
        _ => None,
    }
}

fn derive(store: &InMemoryStore, decl_key: &ObjectKey, decl: DynamicObject, behaviour: Behaviour) {
    let uid = decl.metadata.uid.clone().unwrap_or_default();
    let Some((mode, replicas)) = mode_and_replicas(decl_key, decl) else {
        return;
    };
    let (ns, name) = (decl_key.namespace.as_str(), decl_key.name.as_str());
    let labels = json!(redis_labels(name, mode));
    let owner = json!([{
        "apiVersion": decl_key.api_version,
        "kind": decl_key.kind,
        "name": name,
        "uid": uid,
        "controller": true,
        "blockOwnerDeletion": true,
    }]);

    let mut sts_labels = labels.clone();
    if behaviour == Behaviour::ExtraWorkloadLabel {
        sts_labels["team"] = json!("cache");
    }
    store.apply(
        &DerivedResource::Workload.key(ns, name),
        statefulset(ns, name, replicas, &sts_labels, &labels, &owner),
    );

    let [_, services @ ..] = DerivedResource::ALL;
    for resource in services {
        let headless = resource == DerivedResource::HeadlessService;
        store.apply(
            &resource.key(ns, name),
            service(ns, &resource.name(name), headless, &labels, &owner),
        );
    }
}

fn reclaim(store: &InMemoryStore, decl_key: &ObjectKey, behaviour: Behaviour) {
    let (ns, name) = (decl_key.namespace.as_str(), decl_key.name.as_str());
    for resource in DerivedResource::ALL {
        if resource == DerivedResource::Workload && behaviour == Behaviour::OrphansWorkload {
            continue;
        }
        store.remove(&resource.key(ns, name));
    }
}

fn statefulset(
    ns: &str,
    name: &str,
    replicas: i32,
    labels: &Value,
    selector: &Value,
    owner: &Value,
) -> DynamicObject {
    serde_json::from_value(json!({
        "apiVersion": "apps/v1",
        "kind": "StatefulSet",
        "metadata": {
            "name": name,
            "namespace": ns,
            "labels": labels,
            "ownerReferences": owner,
        },
        "spec": {
            "replicas": replicas,
            "serviceName": headless_service_name(name),
            "selector": { "matchLabels": selector },
            "template": {
                "metadata": { "labels": selector },
                "spec": {
                    "containers": [{
                        "name": name,
                        "image": "quay.io/opstree/redis:v7.0.12",
                        "ports": [{ "name": "redis", "containerPort": 6379 }],
                    }]
                }
            }
        }
    }))
    .unwrap()
}

fn service(ns: &str, name: &str, headless: bool, labels: &Value, owner: &Value) -> DynamicObject {
    let mut spec = json!({
        "selector": labels,
        "ports": [{ "name": "redis-client", "port": 6379, "protocol": "TCP" }],
    });
    if headless {
        spec["clusterIP"] = json!("None");
    }
    serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": name,
            "namespace": ns,
            "labels": labels,
            "ownerReferences": owner,
        },
        "spec": spec,
    }))
    .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Per-test context
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-test context: owns a fresh store, a suite over it and the reconciler.
pub struct TestContext {
    pub store: InMemoryStore,
    pub suite: Suite,
    reconciler: JoinHandle<()>,
}

impl TestContext {
    /// A suite whose operator behaves.
    pub fn new() -> Self {
        Self::with_behaviour(Behaviour::Healthy)
    }

    pub fn with_behaviour(behaviour: Behaviour) -> Self {
        init_tracing();
        let store = InMemoryStore::new();
        let reconciler = spawn_reconciler(store.clone(), behaviour);
        let config = HarnessConfig {
            timeout_ms: TIMEOUT.as_millis() as u64,
            interval_ms: POLL.as_millis() as u64,
            namespace: NS.into(),
            ..Default::default()
        };
        let suite = Suite::new(Arc::new(store.clone()), config).expect("valid test config");
        Self {
            store,
            suite,
            reconciler,
        }
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.reconciler.abort();
    }
}

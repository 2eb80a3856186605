//! The object store the harness talks to.
//!
//! [`ObjectStore`] is the only seam between the assertion engine and the
//! backing store.  [`KubeStore`] speaks to a real API server;
//! [`memory::InMemoryStore`] is the double used by the test suite together
//! with a simulated reconciler.

use kube::api::{Api, DeleteParams, DynamicObject, PostParams, ResourceExt};
use kube::core::{ApiResource, GroupVersionKind};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

pub mod memory;

pub use memory::{InMemoryStore, StoreEvent};

// ── ObjectKey ─────────────────────────────────────────────────────────────────

/// Address of one namespaced object in the store.
///
/// The plural is carried explicitly because it cannot always be guessed
/// from the kind (`Redis` is served as `redis`, not `redises`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub api_version: String,
    pub kind: String,
    pub plural: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    /// Key for an object of the statically known type `K`.
    pub fn of<K: Resource<DynamicType = ()>>(namespace: &str, name: &str) -> Self {
        Self {
            api_version: K::api_version(&()).to_string(),
            kind: K::kind(&()).to_string(),
            plural: K::plural(&()).to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Key for an existing typed object.  Fails if the object has no namespace.
    pub fn for_object<K: Resource<DynamicType = ()>>(obj: &K) -> Result<Self> {
        let ns = obj
            .namespace()
            .ok_or_else(|| Error::config(format!("{} {} has no namespace", K::kind(&()), obj.name_any())))?;
        Ok(Self::of::<K>(&ns, &obj.name_any()))
    }

    /// Split `apiVersion` into `(group, version)`; the core group is `""`.
    pub fn group_version(&self) -> (&str, &str) {
        self.api_version
            .split_once('/')
            .unwrap_or(("", self.api_version.as_str()))
    }

    pub fn api_resource(&self) -> ApiResource {
        let (group, version) = self.group_version();
        let gvk = GroupVersionKind::gvk(group, version, &self.kind);
        ApiResource::from_gvk_with_plural(&gvk, &self.plural)
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

// ── Typed <-> dynamic conversion ──────────────────────────────────────────────

/// Serialize a typed resource into the untyped form the store works with.
pub fn to_dynamic<K: Serialize>(obj: &K) -> Result<DynamicObject> {
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

/// Parse an untyped object back into a typed resource.
pub fn from_dynamic<K: DeserializeOwned>(obj: DynamicObject) -> Result<K> {
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

// ── ObjectStore ───────────────────────────────────────────────────────────────

/// Trait abstracting the key/namespace-addressed store so tests can
/// substitute an in-memory double.
///
/// `get` and `delete` report a missing object as an error for which
/// [`Error::is_not_found`] holds.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create(&self, key: &ObjectKey, obj: &DynamicObject) -> Result<()>;

    async fn get(&self, key: &ObjectKey) -> Result<DynamicObject>;

    async fn delete(&self, key: &ObjectKey) -> Result<()>;
}

/// Production implementation backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a store from the ambient kubeconfig / in-cluster config.
    pub async fn try_default() -> Result<Self> {
        Ok(Self::new(Client::try_default().await?))
    }

    fn api(&self, key: &ObjectKey) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), &key.namespace, &key.api_resource())
    }
}

#[async_trait::async_trait]
impl ObjectStore for KubeStore {
    async fn create(&self, key: &ObjectKey, obj: &DynamicObject) -> Result<()> {
        self.api(key).create(&PostParams::default(), obj).await?;
        debug!(%key, "created object");
        Ok(())
    }

    async fn get(&self, key: &ObjectKey) -> Result<DynamicObject> {
        Ok(self.api(key).get(&key.name).await?)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<()> {
        // Background propagation: the API server's garbage collector removes
        // dependents after the owner is gone.
        self.api(key)
            .delete(&key.name, &DeleteParams::background())
            .await?;
        debug!(%key, "deleted object");
        Ok(())
    }
}

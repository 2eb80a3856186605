use std::sync::Arc;

use kube::api::ObjectMeta;
use tracing::info;

use super::identity::NameGenerator;
use super::lifecycle::{CaseRun, Verifier};
use crate::config::HarnessConfig;
use crate::crd::redis::{Redis, RedisSpec};
use crate::crd::redis_replication::{RedisReplication, RedisReplicationSpec};
use crate::error::Result;
use crate::store::{KubeStore, ObjectStore};

/// Per-suite context: the store every case talks to, the suite-wide
/// timing, and the name counter that keeps cases apart.
pub struct Suite {
    store: Arc<dyn ObjectStore>,
    config: HarnessConfig,
    names: NameGenerator,
}

impl Suite {
    /// Fails with [`Error::Config`] if the configuration does not validate.
    ///
    /// [`Error::Config`]: crate::Error::Config
    pub fn new(store: Arc<dyn ObjectStore>, config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        let names = NameGenerator::new(config.name_prefix.clone());
        Ok(Self {
            store,
            config,
            names,
        })
    }

    /// Build a suite against the cluster in the ambient kubeconfig.
    pub async fn connect(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        let store = KubeStore::try_default().await?;
        info!(ns = %config.namespace, "connected harness to cluster");
        Self::new(Arc::new(store), config)
    }

    pub fn verifier(&self) -> Verifier {
        Verifier::new(self.store.clone(), self.config.timing())
    }

    /// Reserve the identity for the next case.
    pub fn next_identity(&self) -> String {
        self.names.next()
    }

    pub fn peek_identity(&self) -> String {
        self.names.peek()
    }

    /// A standalone declaration with an empty spec in the suite namespace.
    pub fn standalone(&self, name: &str) -> Redis {
        Redis {
            metadata: self.metadata(name),
            spec: RedisSpec::default(),
        }
    }

    pub fn replication(&self, name: &str, cluster_size: i32) -> RedisReplication {
        RedisReplication {
            metadata: self.metadata(name),
            spec: RedisReplicationSpec {
                cluster_size,
                ..Default::default()
            },
        }
    }

    /// Identity, declaration and submission in one step.
    pub async fn open_standalone_case(&self) -> Result<CaseRun<Redis>> {
        let name = self.next_identity();
        self.verifier().create(self.standalone(&name)).await
    }

    pub async fn open_replication_case(&self, cluster_size: i32) -> Result<CaseRun<RedisReplication>> {
        let name = self.next_identity();
        self.verifier()
            .create(self.replication(&name, cluster_size))
            .await
    }

    fn metadata(&self, name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(self.config.namespace.clone()),
            ..Default::default()
        }
    }
}

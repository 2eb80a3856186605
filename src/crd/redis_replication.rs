use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::shared::{KubernetesConfig, RedisExporter};
use super::Declaration;
use crate::helpers::SetupMode;

/// RedisReplication is the Schema for a primary/replica Redis set.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "redis.redis.opstreelabs.in",
    version = "v1beta2",
    kind = "RedisReplication",
    plural = "redisreplications",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct RedisReplicationSpec {
    #[serde(default = "default_cluster_size")]
    pub cluster_size: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_config: Option<KubernetesConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_exporter: Option<RedisExporter>,
}

fn default_cluster_size() -> i32 {
    3
}

impl Default for RedisReplicationSpec {
    fn default() -> Self {
        Self {
            cluster_size: default_cluster_size(),
            kubernetes_config: None,
            redis_exporter: None,
        }
    }
}

impl Declaration for RedisReplication {
    fn setup_mode(&self) -> SetupMode {
        SetupMode::Replication
    }

    fn expected_replicas(&self) -> i32 {
        self.spec.cluster_size
    }
}

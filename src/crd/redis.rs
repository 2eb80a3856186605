use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::shared::{KubernetesConfig, RedisExporter};
use super::Declaration;
use crate::helpers::SetupMode;

/// Redis is the Schema for a standalone Redis server.
///
/// Every field is optional: a declaration carrying only a name and a
/// namespace is enough for the operator to derive its resources.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "redis.redis.opstreelabs.in",
    version = "v1beta2",
    kind = "Redis",
    plural = "redis",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct RedisSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_config: Option<KubernetesConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_exporter: Option<RedisExporter>,
}

impl Declaration for Redis {
    fn setup_mode(&self) -> SetupMode {
        SetupMode::Standalone
    }

    fn expected_replicas(&self) -> i32 {
        1
    }
}

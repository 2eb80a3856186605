//! The resources the operator derives from one declaration, and what each
//! of them is expected to look like once reconciled.

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use serde_json::Value;

use super::matcher::ExpectedShape;
use crate::helpers::{additional_service_name, headless_service_name, redis_labels, SetupMode};
use crate::store::ObjectKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DerivedResource {
    /// The StatefulSet running the Redis pods.
    Workload,
    PrimaryService,
    HeadlessService,
    AdditionalService,
}

impl DerivedResource {
    /// Verification order: the workload first, then the services.
    pub const ALL: [DerivedResource; 4] = [
        Self::Workload,
        Self::PrimaryService,
        Self::HeadlessService,
        Self::AdditionalService,
    ];

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Workload => "statefulset",
            Self::PrimaryService => "service",
            Self::HeadlessService => "headless service",
            Self::AdditionalService => "additional service",
        }
    }

    /// Object name for a declaration called `base`.
    pub fn name(&self, base: &str) -> String {
        match self {
            Self::Workload | Self::PrimaryService => base.to_string(),
            Self::HeadlessService => headless_service_name(base),
            Self::AdditionalService => additional_service_name(base),
        }
    }

    pub fn key(&self, namespace: &str, base: &str) -> ObjectKey {
        let name = self.name(base);
        match self {
            Self::Workload => ObjectKey::of::<StatefulSet>(namespace, &name),
            _ => ObjectKey::of::<Service>(namespace, &name),
        }
    }

    /// What a converged object of this kind must look like.
    pub fn expected_shape(&self, base: &str, mode: SetupMode, replicas: i32) -> ExpectedShape {
        let shape = ExpectedShape::new().field("/metadata/labels", label_value(base, mode));
        match self {
            Self::Workload => shape
                .field("/spec/replicas", replicas)
                .field("/spec/serviceName", headless_service_name(base)),
            _ => shape,
        }
    }
}

impl std::fmt::Display for DerivedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

fn label_value(base: &str, mode: SetupMode) -> Value {
    Value::Object(
        redis_labels(base, mode)
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    )
}

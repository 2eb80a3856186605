use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Setup modes ───────────────────────────────────────────────────────────────

/// How the operator lays out a Redis deployment.  Drives the value of the
/// `redis_setup_type` and `role` labels on every derived resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupMode {
    Standalone,
    Replication,
}

impl SetupMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Replication => "replication",
        }
    }
}

impl std::fmt::Display for SetupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Labels ────────────────────────────────────────────────────────────────────

pub const APP_LABEL: &str = "app";
pub const SETUP_TYPE_LABEL: &str = "redis_setup_type";
pub const ROLE_LABEL: &str = "role";

/// The label set the operator stamps on every resource it derives from a
/// declaration named `name`.
pub fn redis_labels(name: &str, mode: SetupMode) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_LABEL.to_string(), name.to_string()),
        (SETUP_TYPE_LABEL.to_string(), mode.as_str().to_string()),
        (ROLE_LABEL.to_string(), mode.as_str().to_string()),
    ])
}

// ── Naming helpers ────────────────────────────────────────────────────────────

/// Name of the headless service (also the StatefulSet `serviceName`).
pub fn headless_service_name(name: &str) -> String {
    format!("{name}-headless")
}

/// Name of the additional (externally addressable) service.
pub fn additional_service_name(name: &str) -> String {
    format!("{name}-additional")
}

//! Intent declarations: the custom resources the harness submits to trigger
//! reconciliation.

use std::fmt::Debug;

use kube::core::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::helpers::SetupMode;

pub mod redis;
pub mod redis_replication;
pub mod shared;

/// A custom resource the operator reconciles into a workload plus services.
///
/// Implementors tell the verifier which setup mode the derived resources are
/// labelled with and how many replicas the workload should carry.
pub trait Declaration:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Serialize
    + DeserializeOwned
    + Clone
    + Debug
    + Send
    + Sync
    + 'static
{
    fn setup_mode(&self) -> SetupMode;

    fn expected_replicas(&self) -> i32;
}

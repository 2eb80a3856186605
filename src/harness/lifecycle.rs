//! Lifecycle verifier.
//!
//! Composes submission, polling and matching into the two scenarios a test
//! case runs: create-and-verify and delete-and-verify.  Every case moves
//! through the phases in [`TRANSITIONS`]; nothing may be skipped, so a
//! delete can only start from a verified case.

use std::sync::Arc;

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use super::derived::DerivedResource;
use super::poller::{Poller, Timing};
use super::submitter::submit;
use crate::crd::Declaration;
use crate::error::{Error, Result};
use crate::store::{from_dynamic, ObjectKey, ObjectStore};

// ── Case phases ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CasePhase {
    Created,
    Converging,
    Verified,
    DeleteIssued,
    Reclaiming,
    Reclaimed,
}

impl std::fmt::Display for CasePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "Created",
            Self::Converging => "Converging",
            Self::Verified => "Verified",
            Self::DeleteIssued => "DeleteIssued",
            Self::Reclaiming => "Reclaiming",
            Self::Reclaimed => "Reclaimed",
        };
        write!(f, "{s}")
    }
}

pub struct Transition {
    pub from: CasePhase,
    pub to: CasePhase,
    pub trigger: &'static str,
}

use CasePhase::*;

pub static TRANSITIONS: &[Transition] = &[
    Transition {
        from: Created,
        to: Converging,
        trigger: "verification started",
    },
    Transition {
        from: Converging,
        to: Verified,
        trigger: "all derived resources match",
    },
    // Re-running the checks on a converged case.
    Transition {
        from: Verified,
        to: Verified,
        trigger: "re-verified",
    },
    Transition {
        from: Verified,
        to: DeleteIssued,
        trigger: "declaration deleted",
    },
    Transition {
        from: DeleteIssued,
        to: Reclaiming,
        trigger: "reclaim poll started",
    },
    Transition {
        from: Reclaiming,
        to: Reclaimed,
        trigger: "workload not found",
    },
];

pub fn transition_allowed(from: CasePhase, to: CasePhase) -> bool {
    TRANSITIONS.iter().any(|t| t.from == from && t.to == to)
}

// ── CaseRun ───────────────────────────────────────────────────────────────────

/// One submitted declaration and how far its verification has got.
#[derive(Debug)]
pub struct CaseRun<D> {
    declaration: D,
    key: ObjectKey,
    phase: CasePhase,
}

impl<D> CaseRun<D> {
    pub fn declaration(&self) -> &D {
        &self.declaration
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    pub fn phase(&self) -> CasePhase {
        self.phase
    }

    fn check(&self, to: CasePhase) -> Result<()> {
        if transition_allowed(self.phase, to) {
            Ok(())
        } else {
            Err(Error::lifecycle(format!(
                "{}: cannot move from {} to {}",
                self.key, self.phase, to
            )))
        }
    }

    fn advance(&mut self, to: CasePhase) -> Result<()> {
        self.check(to)?;
        if self.phase != to {
            info!(ns = %self.key.namespace, name = %self.key.name, from = %self.phase, %to, "case phase");
        }
        self.phase = to;
        Ok(())
    }
}

/// The typed objects observed once a case converged.
#[derive(Clone, Debug)]
pub struct ConvergedResources {
    pub workload: StatefulSet,
    /// Primary, headless and additional service, in that order.
    pub services: Vec<Service>,
}

impl ConvergedResources {
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services
            .iter()
            .find(|s| s.metadata.name.as_deref() == Some(name))
    }
}

// ── Verifier ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Verifier {
    store: Arc<dyn ObjectStore>,
    poller: Poller,
}

impl Verifier {
    pub fn new(store: Arc<dyn ObjectStore>, timing: Timing) -> Self {
        Self {
            store,
            poller: Poller::new(timing),
        }
    }

    /// Submit the declaration.  Rejection is fatal and returned as is.
    pub async fn create<D: Declaration>(&self, declaration: D) -> Result<CaseRun<D>> {
        let key = submit(self.store.as_ref(), &declaration).await?;
        Ok(CaseRun {
            declaration,
            key,
            phase: Created,
        })
    }

    /// Poll every derived resource until it exists and matches its expected
    /// shape.  May be repeated on a verified case.
    pub async fn verify_created<D: Declaration>(
        &self,
        run: &mut CaseRun<D>,
    ) -> Result<ConvergedResources> {
        if run.phase != Verified {
            run.advance(Converging)?;
        } else {
            run.check(Verified)?;
        }

        let [workload, services @ ..] = DerivedResource::ALL;
        let workload: StatefulSet = self.await_derived(run, workload).await?;
        let mut converged = Vec::with_capacity(services.len());
        for resource in services {
            converged.push(self.await_derived::<Service, D>(run, resource).await?);
        }
        let services = converged;

        run.advance(Verified)?;
        Ok(ConvergedResources { workload, services })
    }

    /// Submit, then verify.
    pub async fn create_and_verify<D: Declaration>(
        &self,
        declaration: D,
    ) -> Result<(CaseRun<D>, ConvergedResources)> {
        let mut run = self.create(declaration).await?;
        let converged = self.verify_created(&mut run).await?;
        Ok((run, converged))
    }

    /// Delete the declaration and wait for the workload to be garbage
    /// collected.  Only a verified case may be deleted.
    pub async fn delete_and_verify<D: Declaration>(&self, run: &mut CaseRun<D>) -> Result<()> {
        run.check(DeleteIssued)?;
        self.store
            .delete(&run.key)
            .await
            .map_err(|source| Error::Deletion {
                key: run.key.to_string(),
                source: Box::new(source),
            })?;
        run.advance(DeleteIssued)?;
        run.advance(Reclaiming)?;

        let key = DerivedResource::Workload.key(run.namespace(), run.name());
        let what = format!("{} {} to be reclaimed", DerivedResource::Workload, key.name);
        let store = self.store.clone();
        self.poller
            .eventually_absent(&what, || {
                let store = store.clone();
                let key = key.clone();
                async move { store.get(&key).await }
            })
            .await?;

        run.advance(Reclaimed)
    }

    async fn await_derived<K, D>(&self, run: &CaseRun<D>, resource: DerivedResource) -> Result<K>
    where
        K: DeserializeOwned + Serialize,
        D: Declaration,
    {
        let decl = &run.declaration;
        let key = resource.key(run.namespace(), run.name());
        let shape = resource.expected_shape(run.name(), decl.setup_mode(), decl.expected_replicas());
        let what = format!("{resource} {}", key.name);

        let store = self.store.clone();
        self.poller
            .eventually_matches(
                &what,
                || {
                    let store = store.clone();
                    let key = key.clone();
                    async move { from_dynamic::<K>(store.get(&key).await?) }
                },
                &shape,
            )
            .await
    }
}

//! The eventual-consistency assertion engine.
//!
//! Leaf first: [`identity`] names a case, [`submitter`] hands its
//! declaration to the store, [`poller`] waits for the store to converge,
//! [`matcher`] decides whether what it sees is right, and [`lifecycle`]
//! strings these together into create and delete scenarios.  [`suite`]
//! owns the state shared by all cases of one run.

pub mod derived;
pub mod identity;
pub mod lifecycle;
pub mod matcher;
pub mod poller;
pub mod submitter;
pub mod suite;

pub use derived::DerivedResource;
pub use identity::NameGenerator;
pub use lifecycle::{CasePhase, CaseRun, ConvergedResources, Verifier};
pub use matcher::{ExpectedShape, FieldMismatch};
pub use poller::{PollOutcome, Poller, TimeoutReport, Timing, Verdict};
pub use submitter::submit;
pub use suite::Suite;

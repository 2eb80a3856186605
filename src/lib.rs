//! Convergence-verification harness for the Redis operator.
//!
//! Submits `Redis` declarations to an eventually-consistent object store
//! and asserts, by bounded polling and structural matching, that the
//! operator derives the expected StatefulSet and Services from them and
//! reclaims them on deletion.

pub mod config;
pub mod crd;
pub mod error;
pub mod harness;
pub mod helpers;
pub mod store;

pub use error::{Error, Result};

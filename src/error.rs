use thiserror::Error;

use crate::harness::poller::TimeoutReport;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Object store error: {0}")]
    Store(String),

    #[error("Submission of {key} rejected: {source}")]
    Submission {
        key: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Deletion of {key} rejected: {source}")]
    Deletion {
        key: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Timeout(Box<TimeoutReport>),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

/// Short alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// True for a store-level "object does not exist" answer, whether it came
    /// from the in-memory store or from a 404 on the API server.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Kube(kube::Error::Api(e)) => e.code == 404,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// The timeout diagnostics, if this error is a poll timeout.
    pub fn timeout_report(&self) -> Option<&TimeoutReport> {
        match self {
            Self::Timeout(report) => Some(report.as_ref()),
            _ => None,
        }
    }
}

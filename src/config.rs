//! Suite-wide configuration, read from flags or the environment.

use std::time::Duration;

use clap::Parser;

use crate::error::{Error, Result};
use crate::harness::poller::{Timing, DEFAULT_INTERVAL, DEFAULT_TIMEOUT};

const DEFAULT_LOG_FILTER: &str = "info,kube=warn,hyper=warn,tower=warn";

#[derive(Parser, Clone, Debug, PartialEq, Eq)]
#[command(
    name = "redis-harness",
    about = "Convergence checks for the Redis operator"
)]
pub struct HarnessConfig {
    /// Maximum time to wait for one resource to converge, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_millis() as u64, env = "HARNESS_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Spacing between two probes of the store, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_INTERVAL.as_millis() as u64, env = "HARNESS_INTERVAL_MS")]
    pub interval_ms: u64,

    /// Namespace the declarations are submitted to.
    #[arg(long, default_value = "default", env = "HARNESS_NAMESPACE")]
    pub namespace: String,

    /// Prefix of the per-case resource names.
    #[arg(long, default_value = "redis", env = "HARNESS_NAME_PREFIX")]
    pub name_prefix: String,

    /// Log format: "text" for human-readable, "json" for structured.
    #[arg(long, default_value = "text", env = "LOG_FORMAT")]
    pub log_format: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            namespace: "default".into(),
            name_prefix: "redis".into(),
            log_format: "text".into(),
        }
    }
}

impl HarnessConfig {
    /// Configuration from `HARNESS_*` / `LOG_FORMAT` env vars and defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_args(["redis-harness"])
    }

    /// Parse an explicit argv (first element is the program name).
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Self::try_parse_from(args).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(Error::config("poll interval must be greater than zero"));
        }
        if self.timeout_ms < self.interval_ms {
            return Err(Error::config(format!(
                "timeout ({}ms) is shorter than the poll interval ({}ms)",
                self.timeout_ms, self.interval_ms
            )));
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(Error::config(format!(
                "unknown log format {:?}, expected \"text\" or \"json\"",
                self.log_format
            )));
        }
        Ok(())
    }

    pub fn timing(&self) -> Timing {
        Timing {
            interval: Duration::from_millis(self.interval_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }

    /// Install the global tracing subscriber.  Safe to call more than once.
    pub fn init_tracing(&self) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

        let _ = if self.log_format == "json" {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .json()
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .try_init()
        };
    }
}

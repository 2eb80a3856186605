//! Convergence poller.
//!
//! Turns "the store will eventually reflect this" into a synchronous
//! assertion: probe at a fixed interval until a predicate holds, or give up
//! once the deadline has passed.  Absence and fetch errors are both
//! treated as "not converged yet"; the only terminal failure is a timeout.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::matcher::ExpectedShape;
use crate::error::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
/// Floor for the poll interval.  A zero interval would never yield to the
/// runtime between attempts.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Poll spacing and maximum wait, shared by every poll in a suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// ── Outcomes and verdicts ─────────────────────────────────────────────────────

/// What a single probe saw.
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// The store answered "no such object".
    NotFound,
    /// Any other error.  Transient as far as the poller is concerned.
    FetchError(Error),
    Found(T),
}

impl<T> PollOutcome<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Found(value),
            Err(e) if e.is_not_found() => Self::NotFound,
            Err(e) => Self::FetchError(e),
        }
    }

    pub fn into_found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl<T: Serialize> PollOutcome<T> {
    /// Human-readable rendering for diagnostics; found values as YAML.
    pub fn render(&self) -> String {
        match self {
            Self::NotFound => "not found".to_string(),
            Self::FetchError(e) => format!("fetch error: {e}"),
            Self::Found(value) => match serde_yaml::to_string(value) {
                Ok(yaml) => yaml,
                Err(e) => format!("<unrenderable value: {e}>"),
            },
        }
    }
}

/// A predicate's answer for one outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Satisfied,
    /// Not yet; the reason ends up in the timeout report.
    Pending(String),
}

impl Verdict {
    pub fn pending(reason: impl Into<String>) -> Self {
        Self::Pending(reason.into())
    }
}

fn unavailable<T>(outcome: &PollOutcome<T>) -> Verdict {
    match outcome {
        PollOutcome::NotFound => Verdict::pending("not found"),
        PollOutcome::FetchError(e) => Verdict::pending(format!("fetch error: {e}")),
        PollOutcome::Found(_) => Verdict::pending("present"),
    }
}

// ── Timeout diagnostics ───────────────────────────────────────────────────────

/// Everything known about a poll that never converged.
#[derive(Clone, Debug)]
pub struct TimeoutReport {
    pub what: String,
    pub elapsed: Duration,
    pub attempts: u32,
    /// Why the last attempt did not satisfy the predicate.
    pub reason: String,
    /// The last observed value (YAML) or error.
    pub last_observation: String,
    /// Most recent non-not-found fetch error, if any attempt hit one.
    pub last_fetch_error: Option<String>,
}

impl std::fmt::Display for TimeoutReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "timed out after {:?} ({} attempts) waiting for {}: {}",
            self.elapsed, self.attempts, self.what, self.reason
        )?;
        if let Some(e) = &self.last_fetch_error {
            write!(f, "\nlast fetch error: {e}")?;
        }
        write!(f, "\nlast observation:\n{}", self.last_observation)
    }
}

// ── Poller ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default)]
pub struct Poller {
    timing: Timing,
}

impl Poller {
    /// Intervals below [`MIN_INTERVAL`] are raised to it.
    pub fn new(timing: Timing) -> Self {
        Self {
            timing: Timing {
                interval: timing.interval.max(MIN_INTERVAL),
                ..timing
            },
        }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Probe until `predicate` is satisfied, returning the satisfying outcome.
    ///
    /// Attempts are spaced by the interval; the wait before the last attempt
    /// is shortened so that one attempt lands exactly on the deadline.
    pub async fn poll_until<T, F, Fut, P>(
        &self,
        what: &str,
        mut probe: F,
        mut predicate: P,
    ) -> Result<PollOutcome<T>>
    where
        T: Serialize,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: FnMut(&PollOutcome<T>) -> Verdict,
    {
        let start = Instant::now();
        let deadline = start + self.timing.timeout;
        let mut attempts = 0u32;
        let mut last_fetch_error = None;

        loop {
            attempts += 1;
            let outcome = PollOutcome::from_result(probe().await);

            let reason = match predicate(&outcome) {
                Verdict::Satisfied => {
                    debug!(
                        what,
                        attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "converged"
                    );
                    return Ok(outcome);
                }
                Verdict::Pending(reason) => reason,
            };

            match &outcome {
                PollOutcome::FetchError(e) => {
                    warn!(what, attempt = attempts, error = %e, "fetch failed, still polling");
                    last_fetch_error = Some(e.to_string());
                }
                _ => debug!(what, attempt = attempts, %reason, "not converged yet"),
            }

            let now = Instant::now();
            if now >= deadline {
                let report = TimeoutReport {
                    what: what.to_string(),
                    elapsed: now - start,
                    attempts,
                    reason,
                    last_observation: outcome.render(),
                    last_fetch_error,
                };
                warn!(what, attempts, elapsed_ms = report.elapsed.as_millis() as u64, "poll timed out");
                return Err(Error::Timeout(Box::new(report)));
            }

            tokio::time::sleep(self.timing.interval.min(deadline - now)).await;
        }
    }

    /// Wait until the probe returns any value.
    pub async fn eventually_found<T, F, Fut>(&self, what: &str, probe: F) -> Result<T>
    where
        T: Serialize,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let outcome = self
            .poll_until(what, probe, |outcome| match outcome {
                PollOutcome::Found(_) => Verdict::Satisfied,
                other => unavailable(other),
            })
            .await?;
        outcome
            .into_found()
            .ok_or_else(|| Error::lifecycle(format!("{what}: converged without a value")))
    }

    /// Wait until the probe returns a value whose shape matches `shape`.
    pub async fn eventually_matches<T, F, Fut>(
        &self,
        what: &str,
        probe: F,
        shape: &ExpectedShape,
    ) -> Result<T>
    where
        T: Serialize,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let outcome = self
            .poll_until(what, probe, |outcome| match outcome {
                PollOutcome::Found(value) => shape.verdict(value),
                other => unavailable(other),
            })
            .await?;
        outcome
            .into_found()
            .ok_or_else(|| Error::lifecycle(format!("{what}: converged without a value")))
    }

    /// Wait until the store reports the object as not found.  A present
    /// object or any other error keeps the poll going.
    pub async fn eventually_absent<T, F, Fut>(&self, what: &str, probe: F) -> Result<()>
    where
        T: Serialize,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.poll_until(what, probe, |outcome| match outcome {
            PollOutcome::NotFound => Verdict::Satisfied,
            other => unavailable(other),
        })
        .await?;
        Ok(())
    }
}

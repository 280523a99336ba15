//! Classified retry for outbound fetches
//!
//! Every outbound call is driven through a [`RetryingFetcher`], which owns a
//! [`RetryPolicy`]: a table of retryable status codes, each with its own
//! attempt counter and backoff sleep. Failures are classified per attempt by
//! [`RetryState`]:
//!
//! - status in the table, counter within budget: sleep that code's backoff, try again
//! - status in the table, budget spent: raise or tolerate, per [`Exhaustion`]
//! - any other status: tolerate (record a [`FailedFetch`], cool down, return the empty value)
//! - no status at all (timeout, refused connection): retried on a separate
//!   counter with [`RetryPolicy::transport`], then raise or tolerate per [`Exhaustion`]
//!
//! The empty value is `T::default()`, so callers decide what "nothing" looks like.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::utils::error::FetchError;

/// What happens once a retryable status exceeds its attempt budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exhaustion {
    /// Propagate `FetchError::MaxRetriesExceeded` to the caller
    Raise,
    /// Record a failure and return the empty value
    Tolerate,
}

/// Per-call-site retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts allowed per status code before the budget is spent
    pub max_attempts: u32,

    /// Retryable status codes and the sleep before the next attempt
    pub backoff: BTreeMap<u16, Duration>,

    /// Backoff after a failure with no status code (timeout, refused connection)
    ///
    /// Counted like one more retryable status; `None` gives up on the first one.
    pub transport: Option<Duration>,

    /// Sleep after a tolerated failure
    pub cooldown: Duration,

    /// Behaviour when a retryable status exceeds `max_attempts`
    pub on_exhausted: Exhaustion,
}

impl RetryPolicy {
    /// Archive pages: only server errors retry, and exhaustion is fatal for the day
    pub fn archive() -> Self {
        Self {
            max_attempts: 10,
            backoff: BTreeMap::from([(500, Duration::from_secs(11))]),
            transport: Some(Duration::from_secs(11)),
            cooldown: Duration::from_secs(60),
            on_exhausted: Exhaustion::Raise,
        }
    }

    /// Article pages: rate limiting is routine, so exhaustion degrades to an empty result
    pub fn detail() -> Self {
        Self {
            max_attempts: 10,
            backoff: BTreeMap::from([
                (403, Duration::from_secs(121)),
                (500, Duration::from_secs(11)),
                (503, Duration::from_secs(121)),
            ]),
            transport: Some(Duration::from_secs(11)),
            cooldown: Duration::from_secs(60),
            on_exhausted: Exhaustion::Tolerate,
        }
    }

    /// Backoff for a status code, if it is retryable under this policy
    #[must_use]
    pub fn backoff_for(&self, status: u16) -> Option<Duration> {
        self.backoff.get(&status).copied()
    }
}

/// A fetch that was given up on but did not abort the harvest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFetch {
    /// Status code, absent for transport failures
    pub status: Option<u16>,
    pub url: String,
}

impl fmt::Display for FailedFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{status} {}", self.url),
            None => write!(f, "--- {}", self.url),
        }
    }
}

/// Next move after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Sleep, then attempt again
    Retry(Duration),
    /// Retry budget for `status` is spent
    Exhausted { status: u16, attempts: u32 },
    /// Give up on this input, harvest continues
    Tolerate,
    /// Propagate the original error
    Fail,
}

/// Attempt counters for one invocation
#[derive(Debug)]
pub struct RetryState<'a> {
    policy: &'a RetryPolicy,
    attempts: BTreeMap<u16, u32>,
    transport_failures: u32,
}

impl<'a> RetryState<'a> {
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self {
            policy,
            attempts: BTreeMap::new(),
            transport_failures: 0,
        }
    }

    /// Classify one failure and advance the counters
    pub fn on_failure(&mut self, error: &FetchError) -> Step {
        let Some(status) = error.status() else {
            return self.on_transport_failure();
        };

        let Some(backoff) = self.policy.backoff_for(status) else {
            return Step::Tolerate;
        };

        let count = self.attempts.entry(status).or_insert(0);
        *count += 1;

        if *count > self.policy.max_attempts {
            Step::Exhausted {
                status,
                attempts: *count,
            }
        } else {
            Step::Retry(backoff)
        }
    }

    /// Upstream never answered: retried on its own counter, then handled per policy
    fn on_transport_failure(&mut self) -> Step {
        let give_up = match self.policy.on_exhausted {
            Exhaustion::Raise => Step::Fail,
            Exhaustion::Tolerate => Step::Tolerate,
        };

        let Some(backoff) = self.policy.transport else {
            return give_up;
        };

        self.transport_failures += 1;
        if self.transport_failures > self.policy.max_attempts {
            give_up
        } else {
            Step::Retry(backoff)
        }
    }

    /// Failures seen so far, per status code
    pub fn attempts(&self) -> &BTreeMap<u16, u32> {
        &self.attempts
    }

    /// Transport failures seen so far
    pub fn transport_failures(&self) -> u32 {
        self.transport_failures
    }

    /// Total retryable failures seen so far
    pub fn total(&self) -> u32 {
        self.attempts.values().sum::<u32>() + self.transport_failures
    }

    fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|(status, count)| format!("{status}: {count}"))
            .chain((self.transport_failures > 0).then(|| format!("transport: {}", self.transport_failures)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Drives fetch operations through a [`RetryPolicy`] and keeps the tolerated failures
#[derive(Debug)]
pub struct RetryingFetcher {
    policy: RetryPolicy,
    failures: Mutex<Vec<FailedFetch>>,
}

impl RetryingFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Run `operation` until it succeeds, is tolerated, or raises
    ///
    /// # Arguments
    ///
    /// * `url` - Target of the operation, recorded when a failure is tolerated
    /// * `operation` - One attempt at the fetch
    ///
    /// # Errors
    ///
    /// Returns `FetchError::MaxRetriesExceeded` when a retryable status exhausts its
    /// budget under [`Exhaustion::Raise`], or the transport error itself under the same policy.
    pub async fn run<T, F, Fut>(&self, url: &str, mut operation: F) -> Result<T, FetchError>
    where
        T: Default,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut state = RetryState::new(&self.policy);

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if state.total() > 0 {
                        info!(url, attempts = %state.summary(), "Succeeded after retryable failures");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            match state.on_failure(&error) {
                Step::Retry(delay) => {
                    debug!(
                        url,
                        status = ?error.status(),
                        failures = state.total(),
                        delay_ms = delay.as_millis() as u64,
                        "Retryable status, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Step::Exhausted { status, attempts } => match self.policy.on_exhausted {
                    Exhaustion::Raise => {
                        warn!(url, attempts = %state.summary(), "Retry budget exhausted");
                        return Err(FetchError::MaxRetriesExceeded {
                            status,
                            url: url.to_string(),
                            attempts,
                        });
                    }
                    Exhaustion::Tolerate => {
                        warn!(url, attempts = %state.summary(), "Retry budget exhausted, continuing with empty result");
                        self.record(Some(status), url);
                        return Ok(T::default());
                    }
                },
                Step::Tolerate => {
                    warn!(
                        url,
                        status = ?error.status(),
                        error = %error,
                        cooldown_secs = self.policy.cooldown.as_secs_f64(),
                        "Failed but continuing"
                    );
                    self.record(error.status(), url);
                    tokio::time::sleep(self.policy.cooldown).await;
                    return Ok(T::default());
                }
                Step::Fail => return Err(error),
            }
        }
    }

    fn record(&self, status: Option<u16>, url: &str) {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        failures.push(FailedFetch {
            status,
            url: url.to_string(),
        });
    }

    /// Snapshot of tolerated failures recorded so far
    pub fn failures(&self) -> Vec<FailedFetch> {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

//! Retrying the same page-level action.
//!
//! Not to be confused with the resolver's cascade, which tries different
//! strategies for one target. Here one action is repeated until it succeeds
//! or the budget runs out.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, warn};

use crate::browser::BrowserError;
use crate::error::FlowError;

/// Attempt budget for one step invocation. Dropped when the step exits.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
    pub elapsed: Duration,
    attempts: u32,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, per_attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            per_attempt_timeout,
            elapsed: Duration::ZERO,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts - self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    fn record(&mut self, took: Duration) {
        self.attempts += 1;
        self.elapsed += took;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
    /// Sleep between a failed attempt and the next one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            per_attempt_timeout: Duration::from_secs(30),
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn budget(&self) -> RetryBudget {
        RetryBudget::new(self.max_attempts, self.per_attempt_timeout)
    }

    /// Run `action` until it succeeds. The action receives the per-attempt
    /// timeout it should honour. Fatal errors are not retried.
    pub fn with_retries<T, F>(&self, name: &str, mut action: F) -> Result<T, FlowError>
    where
        F: FnMut(Duration) -> Result<T, BrowserError>,
    {
        let mut budget = self.budget();
        loop {
            let started = Instant::now();
            let outcome = action(budget.per_attempt_timeout);
            budget.record(started.elapsed());

            let e = match outcome {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };

            if e.is_fatal() {
                error!(action = name, error = %e, "fatal error, not retrying");
                return Err(FlowError::ResourceFault(e));
            }
            if budget.is_exhausted() {
                error!(
                    action = name,
                    attempts = budget.attempts(),
                    elapsed = ?budget.elapsed,
                    error = %e,
                    "retry budget exhausted"
                );
                return Err(FlowError::RetriesExhausted {
                    action: name.to_string(),
                    attempts: budget.attempts(),
                    last: e,
                });
            }

            warn!(
                action = name,
                attempt = budget.attempts(),
                remaining = budget.remaining(),
                error = %e,
                "attempt failed, retrying"
            );
            thread::sleep(self.backoff);
        }
    }
}

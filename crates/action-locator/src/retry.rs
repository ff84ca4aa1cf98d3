//! Bounded retry helper
//!
//! Runs an attempt function until it yields a value, fails for good, or the
//! deadline passes. Empty attempts are spaced by a fixed backoff; the last
//! pause is clipped to the deadline so the timeout acts as a ceiling.

use std::future::Future;
use std::time::Duration;

use tokio::select;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::types::{FindOptions, POLL_BACKOFF_MS};

/// Deadline and spacing of a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Policy with the standard backoff
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            backoff: Duration::from_millis(POLL_BACKOFF_MS),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Upper bound on attempts for a target that never matches:
    /// `ceil(timeout / backoff) + 1`
    pub fn max_attempts(&self) -> u32 {
        let backoff = self.backoff.as_nanos();
        if backoff == 0 {
            return u32::MAX;
        }
        let pauses = self.timeout.as_nanos().div_ceil(backoff);
        u32::try_from(pauses.saturating_add(1)).unwrap_or(u32::MAX)
    }
}

impl From<&FindOptions> for RetryPolicy {
    fn from(options: &FindOptions) -> Self {
        Self::new(options.timeout)
    }
}

/// How a poll finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T, E> {
    /// An attempt produced a value
    Resolved { value: T, attempts: u32 },

    /// The deadline passed with only empty attempts. `last_error` holds the
    /// transient error of the final attempt, if it raised one.
    Exhausted { attempts: u32, last_error: Option<E> },
}

impl<T, E> PollOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Resolved { attempts, .. } | PollOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Why a poll stopped early
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError<E> {
    /// A non-transient error; never retried
    Fatal { error: E, attempts: u32 },

    /// The cancellation token fired
    Interrupted { attempts: u32 },
}

/// Poll `attempt` until it yields `Some`, a non-transient error, or the
/// policy's deadline passes.
///
/// `attempt` receives the 1-based attempt number. `Ok(None)` and errors for
/// which `is_transient` holds count as empty attempts. Attempts never overlap.
pub async fn poll_until<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
    is_transient: P,
) -> Result<PollOutcome<T, E>, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    P: Fn(&E) -> bool,
{
    let deadline = Instant::now() + policy.timeout;
    let mut attempts = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(PollError::Interrupted { attempts });
        }

        attempts = attempts.saturating_add(1);
        let last_error = match attempt(attempts).await {
            Ok(Some(value)) => return Ok(PollOutcome::Resolved { value, attempts }),
            Ok(None) => None,
            Err(error) if is_transient(&error) => Some(error),
            Err(error) => return Err(PollError::Fatal { error, attempts }),
        };

        let now = Instant::now();
        if now >= deadline {
            return Ok(PollOutcome::Exhausted {
                attempts,
                last_error,
            });
        }

        let pause = policy.backoff.min(deadline - now);
        trace!(attempt = attempts, pause_ms = pause.as_millis() as u64, "empty attempt");
        select! {
            _ = cancel.cancelled() => return Err(PollError::Interrupted { attempts }),
            _ = sleep(pause) => {}
        }
    }
}

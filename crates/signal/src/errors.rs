//! Error and retry-policy types for the CI signal report domain.
//!
//! [`FetchError`] covers everything that can go wrong while retrieving one
//! piece of upstream data (a page, a card, a dashboard summary). It is scoped
//! to the fetch that produced it: collectors turn it into a section failure
//! instead of aborting the run.
//!
//! [`ReportError`] covers run-level conditions that must stop the tool before
//! any request is issued.
//!
//! [`RetryPolicy`] is a cross-cutting concern: infrastructure adapters consult
//! [`FetchError::retry_policy`] to decide whether to re-issue a request.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: connection failures, HTTP 429, HTTP 5xx.
/// - `NonRetryable` errors: other HTTP statuses, malformed documents, missing
///   board columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt, derived from a
        /// `Retry-After` response header. `None` means apply the caller's own
        /// back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

/// Bounded exponential back-off used by the infrastructure adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySchedule {
    /// Total number of attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for every later attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl RetrySchedule {
    /// Returns the delay to wait after the failed attempt number `attempt`
    /// (1-based), or `None` when the attempt budget is exhausted.
    ///
    /// A server-provided `hint` overrides the computed delay but is still
    /// capped at [`RetrySchedule::max_delay`].
    pub fn delay_after(&self, attempt: u32, hint: Option<Duration>) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let computed = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        Some(hint.unwrap_or(computed).min(self.max_delay))
    }

    /// Drives `attempt` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is exhausted; the last error is returned.
    ///
    /// `sleep` waits out each back-off delay. The domain stays free of any
    /// runtime; adapters pass `tokio::time::sleep`.
    pub async fn run<T, A, AF, S, SF>(&self, mut attempt: A, mut sleep: S) -> Result<T, FetchError>
    where
        A: FnMut() -> AF,
        AF: Future<Output = Result<T, FetchError>>,
        S: FnMut(Duration) -> SF,
        SF: Future<Output = ()>,
    {
        let mut attempts = 1;
        loop {
            let error = match attempt().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            let RetryPolicy::Retryable { after } = error.retry_policy() else {
                return Err(error);
            };
            let Some(delay) = self.delay_after(attempts, after) else {
                tracing::warn!(%error, attempts, "Giving up after retries");
                return Err(error);
            };
            tracing::debug!(%error, attempt = attempts, ?delay, "Retrying request");
            sleep(delay).await;
            attempts += 1;
        }
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch-level errors
// ---------------------------------------------------------------------------

/// Failure to retrieve or interpret one upstream document.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum FetchError {
    /// The request could not be completed, or completed with a non-success
    /// HTTP status.
    #[error("request to {url} failed{}: {message}", status_suffix(.status))]
    Transport {
        /// URL of the failed request.
        url: String,
        /// HTTP status, when the server answered.
        status: Option<u16>,
        /// Human-readable transport diagnostic.
        message: String,
        /// Server-provided retry hint (`Retry-After`), if any.
        retry_after: Option<Duration>,
    },

    /// The response body did not have the expected document shape, or a
    /// field inside it did not match the expected format.
    #[error("could not decode {url}: {message}")]
    Decode {
        /// URL (or logical source) of the offending document.
        url: String,
        /// Description of the decoding problem.
        message: String,
    },

    /// An expected named entity (board column, dashboard) does not exist.
    #[error("could not resolve {what}")]
    Resolution {
        /// Description of what was being looked up.
        what: String,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {s}")).unwrap_or_default()
}

impl FetchError {
    /// Creates a [`FetchError::Transport`] for a connection-level failure.
    pub fn connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Creates a [`FetchError::Transport`] for a non-success HTTP status.
    ///
    /// `retry_after` is the raw `Retry-After` header value; only the
    /// delay-seconds form is understood.
    pub fn status(
        url: impl Into<String>,
        status: u16,
        message: impl Into<String>,
        retry_after: Option<&str>,
    ) -> Self {
        Self::Transport {
            url: url.into(),
            status: Some(status),
            message: message.into(),
            retry_after: retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        }
    }

    /// Creates a [`FetchError::Decode`].
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns whether re-issuing the failed request may succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport {
                status: None,
                retry_after,
                ..
            } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::Transport {
                status: Some(status),
                retry_after,
                ..
            } if *status == 429 || (500..600).contains(status) => RetryPolicy::Retryable {
                after: *retry_after,
            },
            _ => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// Errors that prevent a report run from starting.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ReportError {
    /// The run configuration is invalid.
    ///
    /// Produced during validation; no request is ever issued with an invalid
    /// configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use futures::executor::block_on;

    use super::*;

    fn http(status: u16) -> FetchError {
        FetchError::Transport {
            url: "https://api.github.com/x".into(),
            status: Some(status),
            message: "boom".into(),
            retry_after: None,
        }
    }

    #[test]
    fn server_errors_and_rate_limits_are_retryable() {
        assert_eq!(http(502).retry_policy(), RetryPolicy::Retryable { after: None });
        assert_eq!(http(429).retry_policy(), RetryPolicy::Retryable { after: None });
        assert_eq!(
            FetchError::connection("u", "reset").retry_policy(),
            RetryPolicy::Retryable { after: None }
        );
    }

    #[test]
    fn client_errors_and_decode_failures_are_final() {
        assert_eq!(http(404).retry_policy(), RetryPolicy::NonRetryable);
        assert_eq!(
            FetchError::decode("u", "eof").retry_policy(),
            RetryPolicy::NonRetryable
        );
        assert_eq!(
            FetchError::Resolution { what: "column".into() }.retry_policy(),
            RetryPolicy::NonRetryable
        );
    }

    #[test]
    fn transport_message_mentions_status() {
        assert_eq!(
            http(503).to_string(),
            "request to https://api.github.com/x failed with status 503: boom"
        );
        assert_eq!(
            FetchError::connection("u", "reset").to_string(),
            "request to u failed: reset"
        );
    }

    #[test]
    fn schedule_doubles_and_caps() {
        let schedule = RetrySchedule {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(1),
        };
        assert_eq!(schedule.delay_after(1, None), Some(Duration::from_millis(500)));
        assert_eq!(schedule.delay_after(2, None), Some(Duration::from_secs(1)));
        assert_eq!(schedule.delay_after(3, None), Some(Duration::from_secs(1)));
        assert_eq!(schedule.delay_after(5, None), None);
    }

    #[test]
    fn status_constructor_reads_retry_after_seconds() {
        let err = FetchError::status("u", 429, "Too Many Requests", Some(" 2 "));
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(2))
            }
        );
        let err = FetchError::status(
            "u",
            503,
            "Unavailable",
            Some("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(err.retry_policy(), RetryPolicy::Retryable { after: None });
    }

    fn recorded_run(
        schedule: RetrySchedule,
        outcomes: Vec<Result<u32, FetchError>>,
    ) -> (Result<u32, FetchError>, usize, Vec<Duration>) {
        let outcomes = RefCell::new(outcomes.into_iter());
        let calls = Cell::new(0);
        let slept = RefCell::new(Vec::new());
        let result = block_on(schedule.run(
            || {
                calls.set(calls.get() + 1);
                let next = outcomes.borrow_mut().next().expect("more outcomes than attempts");
                async move { next }
            },
            |delay| {
                slept.borrow_mut().push(delay);
                async {}
            },
        ));
        (result, calls.get(), slept.into_inner())
    }

    #[test]
    fn run_retries_transient_failures_with_backoff() {
        let (result, calls, slept) = recorded_run(
            RetrySchedule::default(),
            vec![Err(http(502)), Err(http(503)), Ok(7)],
        );
        assert_eq!(result, Ok(7));
        assert_eq!(calls, 3);
        assert_eq!(slept, [Duration::from_millis(250), Duration::from_millis(500)]);
    }

    #[test]
    fn run_stops_at_attempt_budget() {
        let (result, calls, slept) = recorded_run(
            RetrySchedule::default(),
            vec![Err(http(500)), Err(http(500)), Err(http(500))],
        );
        assert_eq!(result, Err(http(500)));
        assert_eq!(calls, 3);
        assert_eq!(slept.len(), 2);
    }

    #[test]
    fn run_does_not_retry_final_errors() {
        let (result, calls, slept) =
            recorded_run(RetrySchedule::default(), vec![Err(http(404))]);
        assert_eq!(result, Err(http(404)));
        assert_eq!(calls, 1);
        assert!(slept.is_empty());
    }

    #[test]
    fn run_waits_for_server_hint() {
        let limited = FetchError::status("u", 429, "slow down", Some("1"));
        let (result, _, slept) =
            recorded_run(RetrySchedule::default(), vec![Err(limited), Ok(1)]);
        assert_eq!(result, Ok(1));
        assert_eq!(slept, [Duration::from_secs(1)]);
    }

    #[test]
    fn schedule_honours_server_hint_within_cap() {
        let schedule = RetrySchedule::default();
        assert_eq!(
            schedule.delay_after(1, Some(Duration::from_secs(60))),
            Some(schedule.max_delay)
        );
        assert_eq!(
            schedule.delay_after(1, Some(Duration::from_millis(10))),
            Some(Duration::from_millis(10))
        );
    }
}

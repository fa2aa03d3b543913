//! Exponential backoff retry for the chat-completion POST.
//!
//! Transient statuses (429, 500, 502, 503, 504) and connect/timeout faults
//! are resent. Everything else is returned to the caller as-is.

use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::warn;

use crate::error::TransportError;

use super::transport::AttemptSender;
use super::types::{ChatRequest, HttpReply};

/// Status codes that trigger a resend.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Delay before the first retry.
pub const BASE_DELAY: Duration = Duration::from_millis(500);

/// Upper bound on a single delay. Large enough that the schedule keeps
/// doubling across the whole retry range.
const MAX_INTERVAL: Duration = Duration::from_secs(300);

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// How many times to resend, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of resends after the first attempt (0 = single attempt).
    pub max_retries: u32,
    /// Delay before the first resend; each later delay doubles.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: BASE_DELAY,
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.base_delay,
            current_interval: self.base_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: MAX_INTERVAL,
            max_elapsed_time: None, // attempts are bounded by max_retries
            ..Default::default()
        }
    }

    /// The sleep schedule between attempts, one entry per retry.
    pub fn delays(&self) -> Vec<Duration> {
        let mut backoff = self.backoff();
        (0..self.max_retries)
            .filter_map(|_| backoff.next_backoff())
            .collect()
    }
}

/// Send `request`, resending transient failures per `policy`.
///
/// Returns the outcome of the last attempt: a reply (which may still carry a
/// retryable status once attempts run out) or the last transport error.
pub async fn send_with_retry<S>(
    sender: &S,
    policy: &RetryPolicy,
    request: &ChatRequest,
    api_key: &str,
) -> Result<HttpReply, TransportError>
where
    S: AttemptSender + ?Sized,
{
    let mut backoff = policy.backoff();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let outcome = sender.send_once(request, api_key).await;

        let retryable = match &outcome {
            Ok(reply) => is_retryable_status(reply.status),
            Err(e) => e.is_retryable(),
        };
        if !retryable || attempts >= policy.max_attempts() {
            return outcome;
        }

        let Some(wait) = backoff.next_backoff() else {
            return outcome;
        };
        match &outcome {
            Ok(reply) => warn!(
                "Attempt {}/{} got HTTP {}, retrying in {:.1}s",
                attempts,
                policy.max_attempts(),
                reply.status,
                wait.as_secs_f64()
            ),
            Err(e) => warn!(
                "Attempt {}/{} failed: {}, retrying in {:.1}s",
                attempts,
                policy.max_attempts(),
                e,
                wait.as_secs_f64()
            ),
        }
        tokio::time::sleep(wait).await;
    }
}

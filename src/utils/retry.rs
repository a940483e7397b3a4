//! Bounded retry with linear backoff for flaky network calls.
//!
//! Every outbound RPC/HTTP call in this crate goes through [`with_retry`] so
//! chain and market lookups share one policy: `max_attempts` tries, a wait of
//! `base_delay * attempt_number` between them (linear, no jitter), and a
//! per-attempt deadline. Exhaustion surfaces as [`Error::NetworkExhausted`]
//! rather than the raw transport error, so callers can tell "the network gave
//! up" apart from "the data does not exist".

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Default retry budget.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
/// Default backoff unit between attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retry policy for a single logical operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    /// Deadline applied to each individual attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// Run `op` up to `policy.max_attempts` times, waiting `base_delay * attempt`
/// between failures. Validation errors abort immediately; only transport-level
/// failures are worth repeating.
pub async fn with_retry<T, F, Fut>(operation: &str, policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let outcome = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Other(format!(
                "attempt deadline of {:?} exceeded",
                policy.attempt_timeout
            ))),
        };

        match outcome {
            Ok(value) => return Ok(value),
            // Malformed input or a definitively absent account will not get
            // better on retry.
            Err(err @ (Error::InvalidAddress(_) | Error::TokenNotFound(_))) => return Err(err),
            Err(err) => {
                last_error = err.to_string();
                if attempt < attempts {
                    let delay = policy.base_delay * attempt as u32;
                    log::warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation,
                        attempt,
                        attempts,
                        delay,
                        last_error
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    metrics::counter!("solsight_retry_exhausted_total", 1, "operation" => operation.to_string());
    Err(Error::NetworkExhausted {
        operation: operation.to_string(),
        attempts,
        last_error,
    })
}

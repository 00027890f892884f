//! Draining paginated listings, with retry and per-call deadlines.
//!
//! Every external call made by the reports goes through a [`Paginator`].
//! List calls are drained page by page with [`Paginator::collect_all`];
//! single describe calls use [`Paginator::call`]. Both apply the same
//! [`RetryPolicy`]:
//!
//! - each attempt runs under `call_timeout`;
//! - transient failures (see [`SourceError::is_transient`]) are retried
//!   with exponential backoff, re-requesting the same page token;
//! - any other failure is returned unmodified.
//!
//! Retrying happens here and nowhere else: the aggregation and join code
//! only sees the final outcome of each call.

use crate::source::{Page, SourceError};
use std::future::Future;
use std::time::Duration;

/// How hard to try before giving up on one external call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
    /// Deadline for a single attempt.
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt per call.
    pub fn no_retry(call_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            call_timeout,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt + 1` (0-indexed attempt that failed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

/// Executes external calls under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    policy: RetryPolicy,
}

impl Paginator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run one call with deadline and retry.
    ///
    /// `operation` and `key` only name the call in a timeout error; the
    /// call's own errors already carry them.
    pub async fn call<T, F, Fut>(
        &self,
        operation: &str,
        key: &str,
        mut make_call: F,
    ) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let result = match tokio::time::timeout(self.policy.call_timeout, make_call()).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::Timeout {
                    operation: operation.to_string(),
                    key: key.to_string(),
                    timeout: self.policy.call_timeout,
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < max_attempts => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    eprintln!(
                        "⚠️  {} (attempt {}/{}), retrying in {} ms",
                        err,
                        attempt + 1,
                        max_attempts,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Drain a paginated listing into one `Vec`, pages in the order seen.
    ///
    /// `fetch` is called with `None` first and then with each continuation
    /// token until a page comes back without one.
    pub async fn collect_all<T, F, Fut>(
        &self,
        operation: &str,
        key: &str,
        mut fetch: F,
    ) -> Result<Vec<T>, SourceError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Page<T>, SourceError>>,
    {
        let mut items = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let token = next_token.take();
            let page = self
                .call(operation, key, || fetch(token.clone()))
                .await?;

            items.extend(page.items);

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(items),
            }
        }
    }
}

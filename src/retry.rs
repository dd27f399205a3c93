//! Backoff-and-retry driver for remote calls.
//!
//! Each failed attempt is classified and recorded by the [`ErrorProcessor`];
//! retryable failures are re-attempted with exponential backoff (or an
//! explicit delay from a rate-limit hint) plus uniform jitter. The last error
//! is returned unchanged when retries are exhausted.

use crate::classifier::Classification;
use crate::processor::{ErrorProcessor, ProcessedError};
use crate::types::{CallContext, RawCallFailure};
use rand::Rng;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default attempt limit when the caller does not set one
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default first-attempt backoff
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Upper bound (exclusive) of the uniform jitter added to every backoff
const JITTER_MS: u64 = 1000;

/// Predicate deciding whether a classified failure may be retried
pub type RetryCondition = Box<dyn Fn(&Classification) -> bool + Send + Sync>;

/// Handle for abandoning an in-flight retry sequence.
///
/// Checked before every attempt and before every backoff sleep; once
/// triggered, the scheduler rejects with a cancelled classification.
#[derive(Clone, Debug, Default)]
pub struct CancellationHandle {
    flag: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Options controlling one retry sequence
pub struct RetryOptions {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Overrides the default `is_retryable` check
    pub retry_condition: Option<RetryCondition>,
    pub cancellation: Option<CancellationHandle>,
}

impl RetryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_retry_condition(mut self, condition: RetryCondition) -> Self {
        self.retry_condition = Some(condition);
        self
    }

    pub fn with_cancellation(mut self, handle: CancellationHandle) -> Self {
        self.cancellation = Some(handle);
        self
    }

    fn permits_retry(&self, classification: &Classification) -> bool {
        match &self.retry_condition {
            Some(condition) => condition(classification),
            None => classification.is_retryable,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationHandle::is_cancelled)
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            retry_condition: None,
            cancellation: None,
        }
    }
}

/// Re-invokes failing operations until success, exhaustion, a non-retryable
/// classification, or cancellation
pub struct RetryScheduler {
    processor: Arc<ErrorProcessor>,
}

impl RetryScheduler {
    pub fn new(processor: Arc<ErrorProcessor>) -> Self {
        Self { processor }
    }

    /// Run `operation` to completion under the given options.
    ///
    /// Every failed attempt is processed (classified, fingerprinted,
    /// appended to history) before the retry decision, and the running
    /// attempt count is written back onto the error record.
    pub async fn run<T, F, Fut>(
        &self,
        mut operation: F,
        context: &CallContext,
        options: &RetryOptions,
    ) -> Result<T, ProcessedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RawCallFailure>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if options.is_cancelled() {
                return Err(self.processor.cancelled(context.clone()));
            }

            let failure = match operation().await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            let mut processed = self.processor.process(&failure, context.clone());
            attempt += 1;

            if !options.permits_retry(&processed.classification) || attempt > options.max_retries {
                return Err(processed);
            }

            let backoff = processed
                .classification
                .retry_delay
                .unwrap_or_else(|| options.base_delay * 2u32.saturating_pow(attempt - 1));
            let jitter = Duration::from_millis(rand::rng().random_range(0..JITTER_MS));
            self.processor.note_retry(&mut processed, attempt);

            debug!(
                attempt,
                max_retries = options.max_retries,
                delay_ms = (backoff + jitter).as_millis() as u64,
                category = processed.classification.category.as_str(),
                correlation_id = %context.correlation_id,
                "retrying failed call"
            );

            if options.is_cancelled() {
                return Err(self.processor.cancelled(context.clone()));
            }
            tokio::time::sleep(backoff + jitter).await;
        }
    }
}

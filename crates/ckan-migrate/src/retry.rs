//! Retry logic for catalog API calls.
//!
//! Catalog endpoints are retried with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Pause before every retry.
    pub delay: Duration,
}

impl Default for RetryConfig {
    /// Three attempts in total, five seconds apart.
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(5))
    }
}

impl RetryConfig {
    /// Creates a fixed-delay config allowing `attempts` calls in total.
    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            max_retries: attempts.saturating_sub(1),
            delay,
        }
    }

    /// Creates a config with no retries.
    pub fn no_retry() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Total number of calls this config allows.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before the given attempt; the first attempt never waits.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            Duration::ZERO
        } else {
            self.delay
        }
    }
}

/// Determines if an error is retryable.
///
/// Network failures, non-200 responses and unreadable 200 bodies are
/// retried. Application-level failures reported inside a well-formed
/// payload are not.
pub fn is_retryable_error(error: &Error) -> bool {
    matches!(error, Error::Http(_) | Error::Status { .. } | Error::Json(_))
}

/// Executes an async operation with retry logic.
///
/// # Arguments
///
/// * `config` - Retry configuration
/// * `operation_name` - Name for logging purposes
/// * `operation` - The async operation to execute
///
/// # Returns
///
/// The result of the operation, or the last error if all retries failed.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts();
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{}: Succeeded after {} retries", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                if !is_retryable_error(&e) || attempt + 1 >= max_attempts {
                    return Err(e);
                }
                attempt += 1;
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    "{}: {} (attempt {}/{}), retrying in {:?}",
                    operation_name, e, attempt, max_attempts, delay
                );
                sleep(delay).await;
            }
        }
    }
}

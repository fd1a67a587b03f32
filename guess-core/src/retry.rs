use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, warn};

use crate::error::{LedgerError, Result};
use crate::store::StoreError;

/// Bounded exponential backoff applied to every store call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Single attempt, no backoff
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (0 for the first retry)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run a store call, retrying connection failures.
    ///
    /// Data failures are surfaced immediately. Once `max_attempts` calls have
    /// failed with connection errors the last one is surfaced as
    /// [`LedgerError::Unavailable`].
    pub async fn run<T, F, Fut>(&self, operation: &'static str, game_id: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, StoreError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(StoreError::Data(message)) => {
                    error!(game_id, operation, error = %message, "Store returned unusable data");
                    return Err(LedgerError::Data { operation, message });
                }
                Err(err @ StoreError::Connection(_)) => {
                    if attempt >= max_attempts {
                        error!(
                            game_id,
                            operation,
                            attempts = attempt,
                            error = %err,
                            "Store unavailable, giving up"
                        );
                        return Err(LedgerError::Unavailable {
                            operation,
                            attempts: attempt,
                            source: err,
                        });
                    }

                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        game_id,
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Store call failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

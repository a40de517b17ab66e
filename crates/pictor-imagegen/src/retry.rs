use std::future::Future;
use std::time::Duration;

/// Bounded retry with linear backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Multiplied by the number of the attempt that just failed
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Final outcome of a retried operation
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    /// Attempts actually made
    pub attempts: u32,
}

impl RetryPolicy {
    /// Delay before `attempt` (1-based); zero for the first
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt.saturating_sub(1))
    }

    /// Run `op` until it succeeds, returns an error `retryable` rejects, or
    /// the attempt budget is spent
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut op: F, retryable: impl Fn(&E) -> bool) -> Retried<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    return Retried {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(error) if attempt < max_attempts && retryable(&error) => {
                    attempt += 1;
                    tokio::time::sleep(self.delay_before(attempt)).await;
                }
                Err(error) => {
                    return Retried {
                        result: Err(error),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

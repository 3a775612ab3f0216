use crate::error::TransportError;
use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// Failure of a request run under a [`RetryPolicy`].
#[derive(Debug)]
pub enum RetryError<E> {
    Fatal(E),
    AttemptsExceeded(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(err) | RetryError::AttemptsExceeded(err) => err,
        }
    }
}

/// Exponential backoff for transport calls. `max_attempts` counts the first
/// try.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(3, Duration::from_millis(200), Duration::from_secs(5))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// A single attempt; failures surface immediately.
    pub fn none() -> Self {
        RetryPolicy::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub async fn run<F, Fut, T, E, C>(&self, mut op: F, classify: C) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDisposition,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if classify(&err) == RetryDisposition::Stop {
                return Err(RetryError::Fatal(err));
            }
            if attempt >= self.max_attempts {
                return Err(RetryError::AttemptsExceeded(err));
            }

            let delay = self.backoff_delay(attempt - 1);
            warn!(attempt, ?delay, error = %err, "Retrying request");
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// `base_delay * 2^retry`, capped at `max_delay`.
    fn backoff_delay(&self, retry: usize) -> Duration {
        let shift = u32::try_from(retry.min(16)).unwrap_or(16);
        self.base_delay
            .checked_mul(1u32 << shift)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Rate limiting, server-side failures and connection problems are retried;
/// everything else (4xx, decode failures) is returned as is.
pub fn classify_transport_error(err: &TransportError) -> RetryDisposition {
    match err {
        TransportError::Http { status, .. } => classify_status(*status),
        TransportError::Request(req_err) => {
            if req_err.is_timeout() || req_err.is_connect() {
                RetryDisposition::Retry
            } else if let Some(status) = req_err.status() {
                classify_status(status.as_u16())
            } else {
                RetryDisposition::Stop
            }
        }
        TransportError::Decode(_) | TransportError::InvalidRequest(_) => RetryDisposition::Stop,
    }
}

fn classify_status(status: u16) -> RetryDisposition {
    match status {
        408 | 429 | 500 | 502 | 503 | 504 => RetryDisposition::Retry,
        _ => RetryDisposition::Stop,
    }
}

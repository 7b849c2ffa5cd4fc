use std::future::Future;
use std::time::Duration;

/// Bounded, fixed-interval polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Ready { value, .. } => Some(value),
            Self::Exhausted { .. } => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Ready { attempts, .. } | Self::Exhausted { attempts } => *attempts,
        }
    }
}

/// Sleeps `interval`, then calls `check`, up to `max_attempts` times.
/// Stops at the first `Some`.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut check: F) -> PollOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=policy.max_attempts {
        if !policy.interval.is_zero() {
            tokio::time::sleep(policy.interval).await;
        }
        if let Some(value) = check(attempt).await {
            return PollOutcome::Ready { value, attempts: attempt };
        }
    }
    PollOutcome::Exhausted {
        attempts: policy.max_attempts,
    }
}

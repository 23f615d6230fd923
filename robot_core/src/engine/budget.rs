use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared early-termination flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Wall clock plus cancellation for one search call. Engines poll it at
/// node or iteration boundaries; nothing is interrupted preemptively.
#[derive(Debug, Clone)]
pub struct SearchBudget {
    start: Instant,
    time_limit: Option<Duration>,
    cancel: CancelToken,
}

impl SearchBudget {
    #[must_use]
    pub fn new(time_limit: Option<Duration>, cancel: CancelToken) -> Self {
        Self {
            start: Instant::now(),
            time_limit,
            cancel,
        }
    }

    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(None, CancelToken::new())
    }

    #[must_use]
    pub fn with_time_limit(limit: Duration) -> Self {
        Self::new(Some(limit), CancelToken::new())
    }

    #[must_use]
    pub const fn has_time_limit(&self) -> bool {
        self.time_limit.is_some()
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub fn expired(&self) -> bool {
        self.is_cancelled() || self.time_limit.is_some_and(|limit| self.elapsed() >= limit)
    }

    /// True once `fraction` of the time limit has been used. Always false
    /// without a time limit.
    #[must_use]
    pub fn past_fraction(&self, fraction: f64) -> bool {
        self.time_limit
            .is_some_and(|limit| self.elapsed().as_secs_f64() >= limit.as_secs_f64() * fraction)
    }
}

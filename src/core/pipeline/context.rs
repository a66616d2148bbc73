//! Cancellation and deadline primitives shared by the pipeline, scanner,
//! and gate engine (§5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::errors::{HardGatesError, Result};

/// Cooperative cancellation flag, cheaply cloned and shared across threads.
///
/// Checked at file, pattern, and stage granularity; nothing polls it on a
/// timer. A cancelled token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Construct a fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once `cancel` has been called on this token or any of its clones.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Convenience check that turns a live cancellation into an error,
    /// for use at loop/stage boundaries.
    pub fn check(&self, context: impl Into<String>) -> Result<()> {
        if self.is_cancelled() {
            Err(HardGatesError::cancelled(context))
        } else {
            Ok(())
        }
    }
}

/// A wall-clock deadline, evaluated lazily against [`Instant::now`].
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Time remaining, or `Duration::ZERO` if already expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Convenience check that turns an expired deadline into an error, for
    /// use at loop/stage boundaries.
    pub fn check(&self, context: impl Into<String>) -> Result<()> {
        if self.is_expired() {
            Err(HardGatesError::deadline_exceeded(context))
        } else {
            Ok(())
        }
    }
}

/// Combined cooperative stop signal passed down into the scanner and
/// collectors: either cancellation or deadline expiry ends work early with
/// partial results rather than an error bubbling out of the whole scan.
#[derive(Debug, Clone)]
pub struct StopSignal {
    /// Cancellation flag.
    pub cancel: CancelToken,
    /// Wall-clock deadline for the owning scan.
    pub deadline: Deadline,
}

impl StopSignal {
    /// Construct a signal with a fresh cancel token and the given deadline.
    pub fn new(deadline: Deadline) -> Self {
        Self {
            cancel: CancelToken::new(),
            deadline,
        }
    }

    /// True if cancellation was requested or the deadline has passed.
    pub fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_starts_live() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check("test").is_ok());
    }

    #[test]
    fn cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn deadline_after_zero_is_immediately_expired() {
        let deadline = Deadline::after(Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(deadline.is_expired());
        assert!(deadline.check("test").is_err());
    }

    #[test]
    fn deadline_far_in_future_is_not_expired() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(!deadline.is_expired());
        assert!(deadline.remaining() > Duration::from_secs(30));
    }

    #[test]
    fn stop_signal_reflects_either_condition() {
        let signal = StopSignal::new(Deadline::after(Duration::from_secs(60)));
        assert!(!signal.should_stop());
        signal.cancel.cancel();
        assert!(signal.should_stop());
    }
}

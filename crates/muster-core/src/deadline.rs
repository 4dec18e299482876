//! Cooperative soft deadlines.

use std::time::{Duration, Instant};

/// A soft wall-clock cutoff polled cooperatively by long-running passes.
///
/// Deadlines are never enforced from outside a pass; search loops poll
/// [`Deadline::expired`] every few dozen iterations and return their best
/// partial result when it trips.
///
/// # Example
///
/// ```
/// use muster_core::Deadline;
///
/// let deadline = Deadline::millis(50);
/// assert!(!deadline.expired());
///
/// let unbounded = Deadline::unbounded();
/// assert!(!unbounded.expired());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn unbounded() -> Self {
        Self {
            start: Instant::now(),
            limit: None,
        }
    }

    /// Expires `limit` after construction.
    pub fn after(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit: Some(limit),
        }
    }

    pub fn millis(ms: u64) -> Self {
        Self::after(Duration::from_millis(ms))
    }

    /// Time since the deadline was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// True once the soft limit has been reached.
    pub fn expired(&self) -> bool {
        self.limit.is_some_and(|limit| self.start.elapsed() >= limit)
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_expires() {
        let deadline = Deadline::unbounded();
        assert!(!deadline.expired());
    }

    #[test]
    fn zero_limit_expires_immediately() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.expired());
    }
}

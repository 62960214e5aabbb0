//! Progress throttling and cooperative cancellation.
//!
//! [`CancellationToken`] is the single cross-thread flag shared by the
//! initiating thread and the extraction worker. [`ProgressThrottle`] turns
//! kept frames into per-file percentages at a fixed cadence.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

/// Number of kept frames between two progress reports.
pub const PROGRESS_EVERY_KEPT_FRAMES: u64 = 5;

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone the token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to request
/// cancellation. The extraction worker checks the flag before each file and
/// after each frame read, so cancellation lands within one frame decode.
///
/// # Example
///
/// ```
/// use drag2frames::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// let worker_view = token.clone();
/// token.cancel();
/// assert!(worker_view.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `true` if both tokens are clones of the same original.
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-file progress computation.
///
/// Every [`PROGRESS_EVERY_KEPT_FRAMES`]th kept frame yields
/// `round(100 * timestamp / duration)`, clamped to `0..=100` and never lower
/// than the previous report for the same file. Files with a zero duration
/// never report.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    duration: Duration,
    kept: u64,
    last_percent: u8,
}

impl ProgressThrottle {
    /// Start tracking a file of the given duration.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            kept: 0,
            last_percent: 0,
        }
    }

    /// Record one kept frame presented at `timestamp`.
    ///
    /// Returns the percentage to report, if this frame is due one.
    pub fn record_kept(&mut self, timestamp: Duration) -> Option<u8> {
        self.kept += 1;
        if self.kept % PROGRESS_EVERY_KEPT_FRAMES != 0 || self.duration.is_zero() {
            return None;
        }

        let ratio = timestamp.as_secs_f64() / self.duration.as_secs_f64();
        let percent = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;
        self.last_percent = self.last_percent.max(percent);
        Some(self.last_percent)
    }

    /// Kept frames recorded so far.
    pub fn kept(&self) -> u64 {
        self.kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity_and_new_tokens_do_not() {
        let token = CancellationToken::new();
        assert!(token.same_as(&token.clone()));
        assert!(!token.same_as(&CancellationToken::new()));
    }

    #[test]
    fn reports_every_fifth_kept_frame() {
        let mut throttle = ProgressThrottle::new(Duration::from_secs(10));
        let reports: Vec<_> = (1..=10)
            .map(|second| throttle.record_kept(Duration::from_secs(second)))
            .collect();
        assert_eq!(reports[..4], [None, None, None, None]);
        assert_eq!(reports[4], Some(50));
        assert_eq!(reports[9], Some(100));
        assert_eq!(throttle.kept(), 10);
    }

    #[test]
    fn clamps_past_duration() {
        let mut throttle = ProgressThrottle::new(Duration::from_secs(1));
        for _ in 0..4 {
            throttle.record_kept(Duration::ZERO);
        }
        assert_eq!(throttle.record_kept(Duration::from_secs(5)), Some(100));
    }

    #[test]
    fn never_decreases() {
        let mut throttle = ProgressThrottle::new(Duration::from_secs(10));
        for _ in 0..4 {
            throttle.record_kept(Duration::ZERO);
        }
        assert_eq!(throttle.record_kept(Duration::from_secs(6)), Some(60));
        for _ in 0..4 {
            throttle.record_kept(Duration::ZERO);
        }
        assert_eq!(throttle.record_kept(Duration::from_secs(3)), Some(60));
    }

    #[test]
    fn zero_duration_never_reports() {
        let mut throttle = ProgressThrottle::new(Duration::ZERO);
        assert!((0..20).all(|_| throttle.record_kept(Duration::from_secs(1)).is_none()));
    }
}

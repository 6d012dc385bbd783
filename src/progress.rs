//! Progress-callback trait for per-attempt solver events.
//!
//! Inject an [`Arc<dyn SolveProgressCallback>`] via
//! [`crate::config::SolverConfigBuilder::progress_callback`] to observe the
//! rotation sweep as it runs: which attempt is in flight, at what rotation,
//! and how many slots it resolved.
//!
//! # Example
//!
//! ```rust
//! use captcha_solver::{SolveProgressCallback, SolverConfig};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct AttemptCounter {
//!     attempts: AtomicU32,
//! }
//!
//! impl SolveProgressCallback for AttemptCounter {
//!     fn on_attempt_complete(&self, attempt: u32, resolved: usize, marked: &str) {
//!         self.attempts.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("attempt {attempt}: {marked} ({resolved} resolved)");
//!     }
//! }
//!
//! let counter = Arc::new(AttemptCounter { attempts: AtomicU32::new(0) });
//!
//! let config = SolverConfig::builder()
//!     .progress_callback(counter as Arc<dyn SolveProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the solver loop as it sweeps through attempts.
///
/// All methods default to no-ops so callers only override what they need.
/// Attempts run one after another, so no two events for the same solve
/// overlap.
pub trait SolveProgressCallback: Send + Sync {
    /// Called once after segmentation, before the first attempt.
    ///
    /// # Arguments
    /// * `letter_count` — slots per attempt
    /// * `max_attempts` — upper bound on attempts
    fn on_solve_start(&self, letter_count: usize, max_attempts: u32) {
        let _ = (letter_count, max_attempts);
    }

    /// Called before the letters of an attempt are read.
    ///
    /// # Arguments
    /// * `attempt`   — 0-based attempt index
    /// * `magnitude` — unsigned rotation in degrees for this attempt
    fn on_attempt_start(&self, attempt: u32, magnitude: i32) {
        let _ = (attempt, magnitude);
    }

    /// Called after an attempt's result is assembled.
    ///
    /// # Arguments
    /// * `attempt`  — 0-based attempt index
    /// * `resolved` — number of non-placeholder slots
    /// * `marked`   — the attempt's result with placeholders shown
    fn on_attempt_complete(&self, attempt: u32, resolved: usize, marked: &str) {
        let _ = (attempt, resolved, marked);
    }

    /// Called once when the loop stops.
    ///
    /// # Arguments
    /// * `accepted` — whether every slot resolved
    /// * `attempts` — attempts performed
    fn on_solve_complete(&self, accepted: bool, attempts: u32) {
        let _ = (accepted, attempts);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SolveProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SolverConfig`].
pub type ProgressCallback = Arc<dyn SolveProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        magnitudes: Mutex<Vec<i32>>,
        finished: Mutex<Option<(bool, u32)>>,
    }

    impl SolveProgressCallback for TrackingCallback {
        fn on_attempt_start(&self, _attempt: u32, magnitude: i32) {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.magnitudes.lock().unwrap().push(magnitude);
        }

        fn on_attempt_complete(&self, _attempt: u32, _resolved: usize, _marked: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_solve_complete(&self, accepted: bool, attempts: u32) {
            *self.finished.lock().unwrap() = Some((accepted, attempts));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_solve_start(6, 12);
        cb.on_attempt_start(0, 14);
        cb.on_attempt_complete(0, 4, "AB_C_D");
        cb.on_solve_complete(false, 12);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_attempt_start(0, 14);
        tracker.on_attempt_complete(0, 5, "ABC_EF");
        tracker.on_attempt_start(1, 16);
        tracker.on_attempt_complete(1, 6, "ABCDEF");
        tracker.on_solve_complete(true, 2);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(*tracker.magnitudes.lock().unwrap(), vec![14, 16]);
        assert_eq!(*tracker.finished.lock().unwrap(), Some((true, 2)));
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_solve_start(6, 12);
        cb.on_attempt_start(0, 14);
    }
}

//! Search control: stop flag, node budget and deadlines.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::limits::TimeBudget;

/// Decides when a running search has to give up.
///
/// Two questions are asked of it:
/// - [`should_abort`](Self::should_abort), from inside the tree every few
///   thousand nodes: stop flag, node budget, hard deadline.
/// - [`should_stop_iterating`](Self::should_stop_iterating), between
///   iterations: stop flag, node budget, scaled soft deadline.
#[derive(Debug)]
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    start: Instant,
    node_limit: Option<u64>,
    budget: Option<TimeBudget>,
    /// Soft-limit multiplier in percent, set from move stability.
    soft_scale: u32,
}

impl SearchControl {
    /// Start the clock now.
    pub fn new(stopped: Arc<AtomicBool>, node_limit: Option<u64>, budget: Option<TimeBudget>) -> Self {
        Self {
            stopped,
            start: Instant::now(),
            node_limit,
            budget,
            soft_scale: 100,
        }
    }

    /// Check whether the search should abort immediately.
    ///
    /// When a limit fires the stop flag is raised, so later calls return
    /// without re-reading the clock.
    pub fn should_abort(&self, nodes: u64) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }

        let over_nodes = self.node_limit.is_some_and(|limit| nodes >= limit);
        let over_time = self.budget.is_some_and(|b| self.elapsed() >= b.hard);
        if over_nodes || over_time {
            self.stopped.store(true, Ordering::Relaxed);
            return true;
        }

        false
    }

    /// Check whether iterative deepening should start another iteration.
    pub fn should_stop_iterating(&self, nodes: u64) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }
        if self.node_limit.is_some_and(|limit| nodes >= limit) {
            return true;
        }
        self.soft_limit().is_some_and(|soft| self.elapsed() >= soft)
    }

    /// The soft limit after stability scaling, never past the hard limit.
    pub fn soft_limit(&self) -> Option<Duration> {
        self.budget
            .map(|b| (b.soft * self.soft_scale / 100).min(b.hard))
    }

    /// Set the soft-limit multiplier (percent).
    pub fn set_soft_scale(&mut self, percent: u32) {
        self.soft_scale = percent;
    }

    /// Time since the search started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

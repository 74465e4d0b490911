//! Search budgets: what the caller asked for and how clock time becomes deadlines.

use std::time::Duration;

use crate::score::MAX_PLY;
use crate::types::Color;

/// Resource budget for one search request.
///
/// All fields are optional; an empty `SearchLimits` searches until stopped
/// or until the maximum depth is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchLimits {
    /// Maximum iteration depth.
    pub depth: Option<u8>,
    /// Node budget.
    pub nodes: Option<u64>,
    /// Fixed time for this move.
    pub movetime: Option<Duration>,
    /// Remaining clock time, indexed by [`Color::index`].
    pub time: [Option<Duration>; 2],
    /// Increment per move, indexed by [`Color::index`].
    pub inc: [Option<Duration>; 2],
    /// Moves until the next time control.
    pub movestogo: Option<u32>,
    /// Search until told to stop, ignoring the clock.
    pub infinite: bool,
}

impl SearchLimits {
    /// Search to a fixed depth.
    pub fn depth(depth: u8) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    /// Search a fixed number of nodes.
    pub fn nodes(nodes: u64) -> Self {
        Self {
            nodes: Some(nodes),
            ..Self::default()
        }
    }

    /// Search for a fixed time.
    pub fn movetime(movetime: Duration) -> Self {
        Self {
            movetime: Some(movetime),
            ..Self::default()
        }
    }

    /// Deepest iteration the driver may start.
    pub fn max_depth(&self) -> i32 {
        let cap = MAX_PLY as i32 - 1;
        self.depth.map_or(cap, |d| (d as i32).clamp(1, cap))
    }

    /// Convert the request into wall-clock deadlines for `side`.
    ///
    /// Priority order:
    /// 1. `infinite` -> no deadlines
    /// 2. `movetime` -> soft = hard = movetime minus overhead
    /// 3. clock for `side` present -> [`compute_budget`]
    /// 4. otherwise -> no deadlines
    pub fn time_budget(&self, side: Color, overhead: Duration) -> Option<TimeBudget> {
        if self.infinite {
            return None;
        }
        if let Some(movetime) = self.movetime {
            let t = movetime.saturating_sub(overhead).max(Duration::from_millis(1));
            return Some(TimeBudget { soft: t, hard: t });
        }
        let remaining = self.time[side.index()]?;
        let increment = self.inc[side.index()].unwrap_or(Duration::ZERO);
        Some(compute_budget(remaining, increment, self.movestogo, overhead))
    }
}

/// Soft and hard deadlines, both measured from the start of the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    /// Do not start another iteration once this has passed.
    pub soft: Duration,
    /// Abort the search outright once this has passed.
    pub hard: Duration,
}

/// Compute soft and hard limits from remaining time and increment.
///
/// | Parameter           | No increment | With increment      |
/// |---------------------|--------------|---------------------|
/// | Moves to go         | 30           | 25                  |
/// | Soft                | `usable/mtg` | `usable/mtg + ¾inc` |
/// | Hard cap (% usable) | 12%          | 25%                 |
/// | Hard/soft ratio cap | 2.5x         | 3.0x                |
///
/// An explicit `moves_to_go` replaces the default.
pub fn compute_budget(
    remaining: Duration,
    increment: Duration,
    moves_to_go: Option<u32>,
    overhead: Duration,
) -> TimeBudget {
    let one_ms = Duration::from_millis(1);
    let remaining_ms = remaining.as_millis() as f64;
    let overhead_ms = overhead.as_millis() as f64;

    if remaining_ms <= overhead_ms {
        return TimeBudget {
            soft: one_ms,
            hard: one_ms,
        };
    }

    let usable = (remaining_ms - overhead_ms).max(1.0);
    let inc_ms = increment.as_millis() as f64;
    let has_increment = inc_ms > 0.0;

    let mtg = match moves_to_go {
        Some(x) => x.max(1) as f64,
        None if has_increment => 25.0,
        None => 30.0,
    };

    let base = usable / mtg;
    let soft = if has_increment { base + inc_ms * 0.75 } else { base };

    let hard_cap_pct = if has_increment { 0.25 } else { 0.12 };
    let hard_ratio_cap = if has_increment { 3.0 } else { 2.5 };
    let hard = (usable * hard_cap_pct).min(soft * hard_ratio_cap);

    let hard = hard.min(usable).max(1.0);
    let soft = soft.min(hard).max(1.0);

    TimeBudget {
        soft: Duration::from_millis(soft as u64),
        hard: Duration::from_millis(hard as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERHEAD: Duration = Duration::from_millis(10);

    #[test]
    fn budget_with_increment() {
        let b = compute_budget(Duration::from_secs(300), Duration::from_secs(2), None, OVERHEAD);
        // mtg=25: base = 299990/25 ~ 11999, soft ~ 13499
        assert!(b.soft.as_millis() > 13_000, "soft={:?}", b.soft);
        assert!(b.soft.as_millis() < 14_000, "soft={:?}", b.soft);
        assert!(b.hard > b.soft);
        // min(usable*0.25, soft*3.0) ~ 40498
        assert!(b.hard.as_millis() < 41_000, "hard={:?}", b.hard);
    }

    #[test]
    fn budget_without_increment() {
        let b = compute_budget(Duration::from_secs(300), Duration::ZERO, None, OVERHEAD);
        // mtg=30: soft ~ 9999
        assert!(b.soft.as_millis() > 9_500, "soft={:?}", b.soft);
        assert!(b.soft.as_millis() < 10_500, "soft={:?}", b.soft);
        // 12% of usable ~ 35998, 2.5 * soft ~ 24999
        assert!(b.hard.as_millis() < 25_100, "hard={:?}", b.hard);
    }

    #[test]
    fn no_increment_hard_cap_is_tight() {
        let b = compute_budget(Duration::from_secs(60), Duration::ZERO, None, OVERHEAD);
        // 12% of 59990 = 7198.8
        assert!(b.hard.as_millis() <= 7_200, "hard={:?}", b.hard);
    }

    #[test]
    fn explicit_moves_to_go_is_used() {
        let b = compute_budget(Duration::from_secs(60), Duration::ZERO, Some(10), OVERHEAD);
        // base = 59990/10 ~ 5999, still under the 12% hard cap (7198)
        assert!(b.soft.as_millis() > 5_000, "soft={:?}", b.soft);
        assert!(b.soft.as_millis() < 7_000, "soft={:?}", b.soft);
    }

    #[test]
    fn low_time_clamps_to_one_ms() {
        for remaining in [Duration::ZERO, Duration::from_millis(5), OVERHEAD] {
            let b = compute_budget(remaining, Duration::ZERO, None, OVERHEAD);
            assert_eq!(b.soft, Duration::from_millis(1));
            assert_eq!(b.hard, Duration::from_millis(1));
        }
    }

    #[test]
    fn soft_never_exceeds_hard() {
        let b = compute_budget(Duration::from_millis(500), Duration::from_secs(5), None, OVERHEAD);
        assert!(b.soft <= b.hard, "{b:?}");
    }

    #[test]
    fn time_budget_priorities() {
        let mut limits = SearchLimits {
            time: [Some(Duration::from_secs(60)), Some(Duration::from_secs(30))],
            ..SearchLimits::default()
        };
        let white = limits.time_budget(Color::White, OVERHEAD).unwrap();
        let black = limits.time_budget(Color::Black, OVERHEAD).unwrap();
        assert!(white.soft > black.soft);

        limits.movetime = Some(Duration::from_millis(500));
        let fixed = limits.time_budget(Color::White, OVERHEAD).unwrap();
        assert_eq!(fixed.soft, Duration::from_millis(490));
        assert_eq!(fixed.hard, fixed.soft);

        limits.infinite = true;
        assert!(limits.time_budget(Color::White, OVERHEAD).is_none());
    }

    #[test]
    fn depth_only_has_no_deadline() {
        let limits = SearchLimits::depth(6);
        assert!(limits.time_budget(Color::White, OVERHEAD).is_none());
        assert_eq!(limits.max_depth(), 6);
        assert_eq!(SearchLimits::default().max_depth(), MAX_PLY as i32 - 1);
        assert_eq!(SearchLimits::depth(0).max_depth(), 1);
    }
}

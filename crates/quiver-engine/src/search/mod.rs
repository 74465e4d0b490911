//! Iterative deepening driver and the searcher that owns the shared tables.

mod negamax;
mod pv;
mod qsearch;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::control::SearchControl;
use crate::error::EngineError;
use crate::history::HistoryHeuristics;
use crate::limits::SearchLimits;
use crate::position::{Evaluator, GenKind, Position};
use crate::score::{DRAW, INFINITE, is_mate, mated_in};
use crate::tt::TranspositionTable;
use crate::types::{Move, MoveList};

use negamax::{NodeKind, SearchOutcome, Worker, nps};

/// Half-width of the first aspiration window.
const ASPIRATION_DELTA: i32 = 25;

/// First depth searched with an aspiration window.
const ASPIRATION_MIN_DEPTH: i32 = 4;

/// Past this half-width the window opens completely.
const ASPIRATION_MAX_DELTA: i32 = 1_000;

/// Smallest and largest accepted transposition table sizes in MB.
pub const MIN_HASH_MB: usize = 1;
pub const MAX_HASH_MB: usize = 65_536;

/// Snapshot published after every completed iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    pub depth: u8,
    pub seldepth: u8,
    pub score: i32,
    pub nodes: u64,
    pub nps: u64,
    pub elapsed: Duration,
    /// Permille of the transposition table in use.
    pub hashfull: u32,
    pub pv: Vec<Move>,
}

/// Outcome of a whole search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Best move of the deepest completed iteration. Null only when the
    /// root has no legal move.
    pub best_move: Move,
    /// Expected reply, second move of the PV.
    pub ponder_move: Option<Move>,
    pub pv: Vec<Move>,
    pub score: i32,
    pub depth: u8,
    pub seldepth: u8,
    pub nodes: u64,
    pub elapsed: Duration,
}

/// Progress notifications delivered to the caller during a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    /// An iteration completed.
    Iteration(SearchReport),
    /// Periodic heartbeat during a long iteration.
    Progress {
        nodes: u64,
        nps: u64,
        elapsed: Duration,
        hashfull: u32,
    },
    /// The search is over; this is always the last event.
    Finished(SearchResult),
}

/// Tracks best-move stability across iterations for time management.
///
/// A best move that survives several iterations lets the engine move
/// sooner; a new best move or a falling score buys more time.
struct StabilityTracker {
    last_move: Move,
    last_score: i32,
    stable_streak: usize,
}

/// Soft-limit percentage by number of iterations the best move has held.
const STABILITY_SCALE: [u32; 5] = [160, 120, 100, 85, 70];

impl StabilityTracker {
    fn new() -> Self {
        Self {
            last_move: Move::NULL,
            last_score: 0,
            stable_streak: 0,
        }
    }

    /// Feed the latest iteration and get the soft-limit scale in percent.
    fn update(&mut self, best_move: Move, score: i32) -> u32 {
        if self.last_move.is_null() {
            self.last_move = best_move;
            self.last_score = score;
            return 100;
        }

        if best_move == self.last_move {
            self.stable_streak += 1;
        } else {
            self.stable_streak = 0;
        }

        let mut scale = STABILITY_SCALE[self.stable_streak.min(STABILITY_SCALE.len() - 1)];
        let drop = self.last_score - score;
        if drop > 100 {
            scale *= 2;
        } else if drop > 50 {
            scale = scale * 3 / 2;
        }

        self.last_move = best_move;
        self.last_score = score;
        scale
    }
}

/// Iterative-deepening searcher owning the transposition table and the
/// ordering statistics, which live as long as the engine.
pub struct Searcher {
    tt: TranspositionTable,
    history: HistoryHeuristics,
    overhead: Duration,
}

impl Searcher {
    /// Create a searcher with a `hash_mb` MB transposition table.
    pub fn new(hash_mb: usize) -> Result<Self, EngineError> {
        check_hash_size(hash_mb)?;
        let tt = TranspositionTable::new(hash_mb);
        debug!(mb = hash_mb, entries = tt.capacity(), "transposition table allocated");
        Ok(Self {
            tt,
            history: HistoryHeuristics::new(),
            overhead: Duration::from_millis(10),
        })
    }

    /// Forget everything learnt from the previous game.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.history.clear();
    }

    /// Clear the transposition table, keeping its allocation.
    pub fn clear_tt(&self) {
        self.tt.clear();
    }

    /// Reallocate the transposition table.
    pub fn resize_tt(&mut self, mb: usize) -> Result<(), EngineError> {
        check_hash_size(mb)?;
        self.tt.resize(mb);
        debug!(mb, entries = self.tt.capacity(), "transposition table resized");
        Ok(())
    }

    /// Time reserved per move for communication lag.
    pub fn set_move_overhead(&mut self, overhead: Duration) {
        self.overhead = overhead;
    }

    /// The transposition table.
    pub fn tt(&self) -> &TranspositionTable {
        &self.tt
    }

    /// Search `pos` within `limits` until done or `stop` is raised.
    ///
    /// Every event, ending with [`SearchEvent::Finished`], goes to `on_event`.
    pub fn search<P, E, F>(
        &mut self,
        pos: &P,
        eval: &E,
        limits: &SearchLimits,
        stop: Arc<AtomicBool>,
        mut on_event: F,
    ) -> SearchResult
    where
        P: Position + Clone,
        E: Evaluator<P>,
        F: FnMut(SearchEvent),
    {
        let control = SearchControl::new(stop, limits.nodes, limits.time_budget(pos.side_to_move(), self.overhead));
        debug!(?limits, soft = ?control.soft_limit(), "search started");

        self.tt.new_search();
        self.history.new_search();

        let mut root_moves = MoveList::new();
        pos.generate(GenKind::Legal, &mut root_moves);
        let fallback = root_moves.iter().copied().find(|&mv| pos.is_legal(mv)).unwrap_or(Move::NULL);

        let tt = &self.tt;
        let mut worker = Box::new(Worker::new(pos.clone(), eval, tt, &mut self.history, control, &mut on_event));

        let mut result = SearchResult {
            best_move: fallback,
            ponder_move: None,
            pv: Vec::new(),
            score: if root_moves.is_empty() && pos.in_check() { mated_in(0) } else { DRAW },
            depth: 0,
            seldepth: 0,
            nodes: 0,
            elapsed: Duration::ZERO,
        };
        let mut stability = StabilityTracker::new();
        let max_depth = limits.max_depth();

        for depth in 1..=max_depth {
            if depth > 1 && worker.control.should_stop_iterating(worker.nodes) {
                break;
            }
            worker.seldepth = 0;

            let Ok(score) = aspiration(&mut worker, depth, result.score) else {
                debug!(depth, nodes = worker.nodes, "iteration aborted");
                break;
            };

            let pv = worker.pv.line(0).to_vec();
            if let Some(&best) = pv.first() {
                result.best_move = best;
                result.ponder_move = pv.get(1).copied();
                result.pv = pv;
            }
            result.score = score;
            result.depth = depth as u8;
            result.seldepth = worker.seldepth.max(depth as usize) as u8;

            let elapsed = worker.control.elapsed();
            let report = SearchReport {
                depth: result.depth,
                seldepth: result.seldepth,
                score,
                nodes: worker.nodes,
                nps: nps(worker.nodes, elapsed),
                elapsed,
                hashfull: tt.hashfull(),
                pv: result.pv.clone(),
            };
            debug!(depth, score, nodes = worker.nodes, best = %result.best_move, "iteration complete");
            worker.emit(SearchEvent::Iteration(report));

            if root_moves.is_empty() {
                break;
            }

            let scale = stability.update(result.best_move, score);
            worker.control.set_soft_scale(scale);
        }

        result.nodes = worker.nodes;
        result.elapsed = worker.control.elapsed();
        info!(
            best = %result.best_move,
            score = result.score,
            depth = result.depth,
            nodes = result.nodes,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "search finished"
        );
        worker.emit(SearchEvent::Finished(result.clone()));
        result
    }
}

fn check_hash_size(mb: usize) -> Result<(), EngineError> {
    if (MIN_HASH_MB..=MAX_HASH_MB).contains(&mb) {
        Ok(())
    } else {
        Err(EngineError::InvalidHashSize {
            mb,
            min: MIN_HASH_MB,
            max: MAX_HASH_MB,
        })
    }
}

/// Search the root inside a window around `prev`, widening until the score fits.
fn aspiration<P: Position, E: Evaluator<P>>(worker: &mut Worker<'_, P, E>, depth: i32, prev: i32) -> SearchOutcome {
    let mut delta = ASPIRATION_DELTA;
    let (mut alpha, mut beta) = if depth >= ASPIRATION_MIN_DEPTH && !is_mate(prev) {
        ((prev - delta).max(-INFINITE), (prev + delta).min(INFINITE))
    } else {
        (-INFINITE, INFINITE)
    };

    loop {
        let score = worker.search(alpha, beta, depth, 0, NodeKind::Root)?;

        if score <= alpha {
            trace!(depth, score, alpha, beta, "aspiration fail-low");
            beta = (alpha + beta) / 2;
            alpha = (score - delta).max(-INFINITE);
        } else if score >= beta {
            trace!(depth, score, alpha, beta, "aspiration fail-high");
            beta = (score + delta).min(INFINITE);
        } else {
            return Ok(score);
        }

        delta += delta / 2;
        if delta > ASPIRATION_MAX_DELTA {
            alpha = -INFINITE;
            beta = INFINITE;
        }
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self {
            tt: TranspositionTable::default(),
            history: HistoryHeuristics::new(),
            overhead: Duration::from_millis(10),
        }
    }
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("tt", &self.tt)
            .field("overhead", &self.overhead)
            .finish()
    }
}

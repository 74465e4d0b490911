//! Principal variation search with pruning and extensions.

use std::time::Duration;

use crate::control::SearchControl;
use crate::history::{HistoryHeuristics, MoveContext};
use crate::ordering::{MovePicker, lmr_reduction};
use crate::position::{Evaluator, Position};
use crate::score::{DRAW, INFINITE, MATE_IN_MAX_PLY, MATED_IN_MAX_PLY, MAX_PLY, NONE, is_mate, mate_in, mated_in};
use crate::search::SearchEvent;
use crate::search::pv::PvTable;
use crate::tt::{Bound, TranspositionTable, TtHit};
use crate::types::{Move, MoveList};

/// Nodes between two looks at the clock and the stop flag.
const CHECK_INTERVAL: u32 = 1024;

/// Time between two progress events during a long iteration.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Razoring margins for depth 2 and 3. A depth-1 node is never razored:
/// quiescence does not try quiet checks, so it would miss a quiet mate.
const RAZOR_MARGIN: [i32; 2] = [280, 300];

/// The search unwound because a limit was hit. Nothing computed since the
/// last completed iteration can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;

/// Score of a node, or the news that the search has been cancelled.
pub type SearchOutcome = Result<i32, Aborted>;

/// Role of a node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Pv,
    NonPv,
}

/// Per-ply scratch data shared between a node and its children.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StackEntry {
    pub static_eval: i32,
    /// Move left out by a singular probe at this ply.
    pub excluded: Move,
    /// Move being searched from this ply (`None` for a null move).
    pub context: Option<MoveContext>,
    pub null_move: bool,
}

impl StackEntry {
    const EMPTY: Self = Self {
        static_eval: NONE,
        excluded: Move::NULL,
        context: None,
        null_move: false,
    };
}

fn reverse_futility_margin(depth: i32, improving: bool) -> i32 {
    80 * (depth - improving as i32)
}

fn futility_margin(depth: i32) -> i32 {
    100 + 120 * depth
}

fn late_move_count(depth: i32, improving: bool) -> usize {
    let base = (3 + depth * depth) as usize;
    if improving { base } else { base / 2 }
}

/// Everything one search thread needs, borrowed from the owning searcher.
pub(crate) struct Worker<'a, P, E> {
    pub pos: P,
    pub eval: &'a E,
    pub tt: &'a TranspositionTable,
    pub history: &'a mut HistoryHeuristics,
    pub control: SearchControl,
    pub pv: PvTable,
    stack: [StackEntry; MAX_PLY + 1],
    pub nodes: u64,
    pub seldepth: usize,
    countdown: u32,
    last_progress: Duration,
    reporter: &'a mut dyn FnMut(SearchEvent),
}

impl<'a, P: Position, E: Evaluator<P>> Worker<'a, P, E> {
    pub fn new(
        pos: P,
        eval: &'a E,
        tt: &'a TranspositionTable,
        history: &'a mut HistoryHeuristics,
        control: SearchControl,
        reporter: &'a mut dyn FnMut(SearchEvent),
    ) -> Self {
        Self {
            pos,
            eval,
            tt,
            history,
            control,
            pv: PvTable::new(),
            stack: [StackEntry::EMPTY; MAX_PLY + 1],
            nodes: 0,
            seldepth: 0,
            countdown: CHECK_INTERVAL,
            last_progress: Duration::ZERO,
            reporter,
        }
    }

    /// Hand an event to the caller.
    pub fn emit(&mut self, event: SearchEvent) {
        (self.reporter)(event);
    }

    /// Count the node and, every [`CHECK_INTERVAL`] nodes, poll the limits.
    pub(crate) fn enter_node(&mut self, ply: usize) -> Result<(), Aborted> {
        self.nodes += 1;
        self.seldepth = self.seldepth.max(ply);
        self.pv.clear(ply);

        self.countdown -= 1;
        if self.countdown == 0 {
            self.countdown = CHECK_INTERVAL;
            if self.control.should_abort(self.nodes) {
                return Err(Aborted);
            }
            let elapsed = self.control.elapsed();
            if elapsed >= self.last_progress + PROGRESS_INTERVAL {
                self.last_progress = elapsed;
                let event = SearchEvent::Progress {
                    nodes: self.nodes,
                    nps: nps(self.nodes, elapsed),
                    elapsed,
                    hashfull: self.tt.hashfull(),
                };
                self.emit(event);
            }
        }
        Ok(())
    }

    /// The move that led to the node at `ply`.
    pub(crate) fn previous(&self, ply: usize) -> Option<MoveContext> {
        ply.checked_sub(1).and_then(|p| self.stack[p].context)
    }

    /// Static evaluation from the TT, the parent after a null move, or the evaluator.
    pub(crate) fn static_eval(&self, ply: usize, tt_hit: Option<TtHit>) -> i32 {
        if let Some(hit) = tt_hit
            && hit.eval != NONE
        {
            return hit.eval;
        }
        if let Some(parent) = ply.checked_sub(1).map(|p| self.stack[p])
            && parent.null_move
            && parent.static_eval != NONE
        {
            return -parent.static_eval + 2 * self.eval.tempo();
        }
        self.eval.evaluate(&self.pos)
    }

    /// Record the move about to be played from `ply`.
    pub(crate) fn set_current(&mut self, ply: usize, mv: Move) {
        let context = self.pos.moved_piece(mv).map(|piece| MoveContext {
            piece,
            to: mv.to(),
            capture: self.pos.captured_piece(mv).is_some(),
        });
        self.stack[ply].context = context;
        self.stack[ply].null_move = false;
    }

    pub(crate) fn set_static_eval(&mut self, ply: usize, eval: i32) {
        self.stack[ply].static_eval = eval;
    }

    /// Negamax with alpha-beta, returning a fail-soft score for the side to move.
    pub fn search(&mut self, mut alpha: i32, mut beta: i32, depth: i32, ply: usize, kind: NodeKind) -> SearchOutcome {
        let pv_node = kind != NodeKind::NonPv;
        let root = kind == NodeKind::Root;

        if depth <= 0 {
            return self.qsearch(alpha, beta, 0, ply, pv_node);
        }

        self.enter_node(ply)?;
        let in_check = self.pos.in_check();
        let excluded = self.stack[ply].excluded;

        if !root {
            if self.pos.is_draw() {
                return Ok(DRAW);
            }
            if ply >= MAX_PLY - 1 {
                return Ok(if in_check { DRAW } else { self.eval.evaluate(&self.pos) });
            }

            // Mate distance pruning: no line from here beats a shorter mate already found.
            alpha = alpha.max(mated_in(ply));
            beta = beta.min(mate_in(ply + 1));
            if alpha >= beta {
                return Ok(alpha);
            }
        }

        let key = self.pos.key();
        let tt_hit = if excluded.is_null() { self.tt.probe(key, ply) } else { None };
        let tt_move = tt_hit.map_or(Move::NULL, |h| h.mv);

        if !pv_node
            && let Some(hit) = tt_hit
            && hit.depth >= depth
            && hit.bound.cuts(hit.score, alpha, beta)
        {
            return Ok(hit.score);
        }

        let side = self.pos.side_to_move();
        let static_eval = if in_check { NONE } else { self.static_eval(ply, tt_hit) };
        self.set_static_eval(ply, static_eval);

        // A TT score that bounds the evaluation in the right direction is a better guess.
        let eval = match tt_hit {
            Some(hit) if !in_check && !is_mate(hit.score) => match hit.bound {
                Bound::Lower if hit.score > static_eval => hit.score,
                Bound::Upper if hit.score < static_eval => hit.score,
                Bound::Exact => hit.score,
                _ => static_eval,
            },
            _ => static_eval,
        };

        let improving = !in_check && ply >= 2 && static_eval > self.stack[ply - 2].static_eval;

        if !pv_node && !in_check && excluded.is_null() {
            // Razoring
            if (2..4).contains(&depth) && !is_mate(alpha) && eval + RAZOR_MARGIN[depth as usize - 2] <= alpha {
                let ralpha = alpha - RAZOR_MARGIN[depth as usize - 2];
                let value = self.qsearch(ralpha, ralpha + 1, 0, ply, false)?;
                if value <= ralpha {
                    return Ok(value);
                }
            }

            // Reverse futility pruning
            if depth < 7
                && eval < MATE_IN_MAX_PLY
                && eval - reverse_futility_margin(depth, improving) >= beta
                && self.pos.non_pawn_material(side)
            {
                return Ok(eval);
            }

            // Null move pruning
            let after_null = ply > 0 && self.stack[ply - 1].null_move;
            if depth >= 2
                && !after_null
                && eval >= beta
                && beta > MATED_IN_MAX_PLY
                && self.pos.non_pawn_material(side)
            {
                let r = 3 + depth / 4 + ((eval - beta) / 200).min(3);
                self.stack[ply].context = None;
                self.stack[ply].null_move = true;
                self.pos.make_null();
                let value = -self.search(-beta, -beta + 1, depth - r, ply + 1, NodeKind::NonPv)?;
                self.pos.unmake_null();
                self.stack[ply].null_move = false;

                // A mate found by passing is not trusted.
                if value >= beta && value < MATE_IN_MAX_PLY {
                    return Ok(value);
                }
            }
        }

        let futile = !root && !in_check && depth < 8 && !is_mate(alpha) && eval + futility_margin(depth) <= alpha;

        let singular_candidate = !root
            && depth >= 8
            && excluded.is_null()
            && tt_hit.is_some_and(|h| {
                !h.mv.is_null()
                    && h.depth >= depth - 3
                    && matches!(h.bound, Bound::Lower | Bound::Exact)
                    && !is_mate(h.score)
            });

        let prev = self.previous(ply);
        let recapture_square = prev.filter(|p| p.capture).map(|p| p.to);
        let mut picker = MovePicker::new(&self.pos, tt_move, self.history, ply, prev);

        let original_alpha = alpha;
        let mut best_score = -INFINITE;
        let mut best_move = Move::NULL;
        let mut searched = 0usize;
        let mut quiets = MoveList::new();

        while let Some(mv) = picker.next(&self.pos) {
            if mv == excluded || !self.pos.is_legal(mv) {
                continue;
            }

            let tactical = self.pos.is_tactical(mv);
            let gives_check = self.pos.gives_check(mv);

            // Move-level pruning, only once a non-losing line is secured.
            if !root && best_score > MATED_IN_MAX_PLY {
                if !tactical && !gives_check {
                    if depth < 8 && searched >= late_move_count(depth, improving) {
                        picker.skip_quiets();
                        continue;
                    }
                    if futile {
                        continue;
                    }
                    if depth < 8 && !picker.see(&self.pos, -25 * depth * depth) {
                        continue;
                    }
                } else if tactical && depth <= 6 && !picker.see(&self.pos, -100 * depth) {
                    continue;
                }
            }

            let mut extension = 0;
            if gives_check && (depth <= 4 || pv_node) && picker.see(&self.pos, 0) {
                extension = 1;
            } else if pv_node && tactical && recapture_square == Some(mv.to()) {
                extension = 1;
            } else if in_check && picker.singular(&self.pos) {
                extension = 1;
            } else if singular_candidate
                && mv == tt_move
                && let Some(hit) = tt_hit
            {
                let s_beta = hit.score - 2 * depth;
                self.stack[ply].excluded = mv;
                let value = self.search(s_beta - 1, s_beta, depth / 2, ply, NodeKind::NonPv);
                self.stack[ply].excluded = Move::NULL;
                if value? < s_beta {
                    extension = 1;
                }
            }

            self.set_current(ply, mv);
            self.pos.make_move(mv);
            searched += 1;
            let new_depth = depth - 1 + extension;

            let score = if searched == 1 {
                let child = if pv_node { NodeKind::Pv } else { NodeKind::NonPv };
                -self.search(-beta, -alpha, new_depth, ply + 1, child)?
            } else {
                let mut reduction = 0;
                if depth >= 3 && !tactical {
                    let mut r = lmr_reduction(searched, depth);
                    if pv_node {
                        r -= 1024;
                    }
                    if picker.is_refutation(mv) {
                        r -= 1024;
                    }
                    if gives_check {
                        r -= 1024;
                    }
                    if !improving {
                        r += 512;
                    }
                    reduction = (r / 1024).max(0).min(new_depth - 1);
                }

                let mut score = -self.search(-alpha - 1, -alpha, new_depth - reduction, ply + 1, NodeKind::NonPv)?;
                if score > alpha && reduction > 0 {
                    score = -self.search(-alpha - 1, -alpha, new_depth, ply + 1, NodeKind::NonPv)?;
                }
                if pv_node && score > alpha && score < beta {
                    score = -self.search(-beta, -alpha, new_depth, ply + 1, NodeKind::Pv)?;
                }
                score
            };

            self.pos.unmake_move(mv);

            if !tactical {
                quiets.push(mv);
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    best_move = mv;
                    if pv_node {
                        self.pv.update(ply, mv);
                    }
                    if score >= beta {
                        break;
                    }
                    alpha = score;
                }
            }
        }

        if searched == 0 {
            return Ok(if !excluded.is_null() {
                alpha
            } else if in_check {
                mated_in(ply)
            } else {
                DRAW
            });
        }

        best_score = best_score.max(mated_in(ply));

        if best_score >= beta && !self.pos.is_tactical(best_move) {
            self.history.update(&self.pos, ply, depth, best_move, quiets.as_slice(), prev);
        }

        if excluded.is_null() {
            let bound = if best_score >= beta {
                Bound::Lower
            } else if best_score > original_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.tt.store(key, ply, best_move, static_eval, best_score, depth, bound);
        }

        Ok(best_score)
    }
}

/// Nodes per second, guarding against a zero elapsed time.
pub(crate) fn nps(nodes: u64, elapsed: Duration) -> u64 {
    let ms = elapsed.as_millis().max(1) as u64;
    nodes.saturating_mul(1000) / ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margins_grow_with_depth() {
        assert!(futility_margin(3) > futility_margin(1));
        assert!(reverse_futility_margin(4, false) > reverse_futility_margin(2, false));
        assert!(reverse_futility_margin(4, true) < reverse_futility_margin(4, false));
    }

    #[test]
    fn improving_nodes_try_more_quiets() {
        for depth in 1..8 {
            assert!(late_move_count(depth, true) >= late_move_count(depth, false));
        }
        assert_eq!(late_move_count(1, true), 4);
    }

    #[test]
    fn nps_handles_zero_time() {
        assert_eq!(nps(5_000, Duration::ZERO), 5_000_000);
        assert_eq!(nps(5_000, Duration::from_secs(1)), 5_000);
    }
}

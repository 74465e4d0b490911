//! Quiescence search: resolve captures before trusting the static evaluation.

use crate::ordering::MovePicker;
use crate::position::{Evaluator, Position};
use crate::score::{DRAW, INFINITE, MAX_PLY, NONE, is_mate, mated_in};
use crate::search::negamax::{SearchOutcome, Worker};
use crate::tt::Bound;
use crate::types::Move;

/// Optimistic extra gain assumed on top of the captured piece.
const DELTA_MARGIN: i32 = 128;

/// Below this depth only recaptures on the last destination square are tried.
const RECAPTURE_DEPTH: i32 = -5;

impl<P: Position, E: Evaluator<P>> Worker<'_, P, E> {
    /// Tactical-only search from a leaf. `depth` counts down from zero.
    pub(crate) fn qsearch(&mut self, mut alpha: i32, beta: i32, depth: i32, ply: usize, pv_node: bool) -> SearchOutcome {
        self.enter_node(ply)?;

        if self.pos.is_draw() {
            return Ok(DRAW);
        }
        let in_check = self.pos.in_check();
        if ply >= MAX_PLY - 1 {
            return Ok(if in_check { DRAW } else { self.eval.evaluate(&self.pos) });
        }

        // Entries from the first quiescence ply (and evasions) are worth more.
        let tt_depth = if in_check || depth >= 0 { 0 } else { -1 };
        let key = self.pos.key();
        let tt_hit = self.tt.probe(key, ply);
        let tt_move = tt_hit.map_or(Move::NULL, |h| h.mv);

        if !pv_node
            && let Some(hit) = tt_hit
            && hit.depth >= tt_depth
            && hit.bound.cuts(hit.score, alpha, beta)
        {
            return Ok(hit.score);
        }

        let original_alpha = alpha;
        let static_eval;
        let mut best_score;
        let futility_base;

        if in_check {
            static_eval = NONE;
            best_score = -INFINITE;
            futility_base = -INFINITE;
        } else {
            static_eval = self.static_eval(ply, tt_hit);
            best_score = static_eval;

            if let Some(hit) = tt_hit
                && !is_mate(hit.score)
                && match hit.bound {
                    Bound::Lower => hit.score > best_score,
                    Bound::Upper => hit.score < best_score,
                    Bound::Exact => true,
                    Bound::None => false,
                }
            {
                best_score = hit.score;
            }

            // Stand pat
            if best_score >= beta {
                if tt_hit.is_none() {
                    self.tt.store(key, ply, Move::NULL, static_eval, best_score, tt_depth, Bound::Lower);
                }
                return Ok(best_score);
            }
            if best_score > alpha {
                alpha = best_score;
            }
            futility_base = best_score + DELTA_MARGIN;
        }
        self.set_static_eval(ply, static_eval);

        let recapture = if depth <= RECAPTURE_DEPTH {
            self.previous(ply).map(|p| p.to)
        } else {
            None
        };
        let mut picker = MovePicker::tactical(&self.pos, tt_move, recapture);
        let mut best_move = Move::NULL;
        let mut searched = 0usize;

        while let Some(mv) = picker.next(&self.pos) {
            if !self.pos.is_legal(mv) {
                continue;
            }

            let gives_check = self.pos.gives_check(mv);

            // Delta pruning
            if !in_check && !gives_check && mv.promotion().is_none() {
                let gain = self.pos.captured_piece(mv).map_or(0, |p| p.value());
                let futility_value = futility_base + gain;
                if futility_value <= alpha {
                    best_score = best_score.max(futility_value);
                    continue;
                }
                if futility_base <= alpha && !picker.see(&self.pos, 1) {
                    best_score = best_score.max(futility_base);
                    continue;
                }
            }

            self.set_current(ply, mv);
            self.pos.make_move(mv);
            searched += 1;
            let score = -self.qsearch(-beta, -alpha, depth - 1, ply + 1, pv_node)?;
            self.pos.unmake_move(mv);

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

        if in_check && searched == 0 {
            return Ok(mated_in(ply));
        }

        let bound = if best_score >= beta {
            Bound::Lower
        } else if pv_node && best_score > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.tt.store(key, ply, best_move, static_eval, best_score, tt_depth, bound);

        Ok(best_score)
    }
}

//! Move ordering via TT move, MVV-LVA, lazy SEE, killers, counter moves and history.

use std::sync::OnceLock;

use crate::history::{HistoryHeuristics, MoveContext};
use crate::position::{GenKind, Position};
use crate::types::{MAX_MOVES, Move, MoveList, PieceKind, Square};

// Score bands, highest first. Quiet history scores live around zero.
const TT_MOVE: i32 = 1_000_000;
const GOOD_TACTICAL: i32 = 500_000;
const KILLER_1: i32 = 400_000;
const KILLER_2: i32 = 390_000;
const COUNTER: i32 = 380_000;
const BAD_TACTICAL: i32 = 100_000;

/// Most valuable victim first, least valuable attacker as tie-break.
///
/// Promotions add the value of the new piece, so a queen promotion
/// outranks every capture of a minor piece.
pub fn mvv_lva(victim: Option<PieceKind>, attacker: Option<PieceKind>, promotion: Option<PieceKind>) -> i32 {
    let victim = victim.map_or(0, PieceKind::value);
    let promotion = promotion.map_or(0, |p| p.value() - PieceKind::Pawn.value());
    let attacker = attacker.map_or(0, PieceKind::index) as i32;
    16 * (victim + promotion) - attacker
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Quiet,
    Tactical,
    /// A capture by a piece worth more than its victim; SEE decides its band on pick.
    Unverified,
}

/// Incremental move picker using selection sort.
///
/// Each call to [`next`](MovePicker::next) scans the unsorted suffix for the
/// highest score. Exchange evaluation is deferred until a capture is about to
/// be yielded, so cutoffs on early moves skip it entirely.
pub struct MovePicker {
    moves: [Move; MAX_MOVES],
    scores: [i32; MAX_MOVES],
    kinds: [Kind; MAX_MOVES],
    len: usize,
    generated: usize,
    cursor: usize,
    /// Drop SEE-losing captures instead of demoting them (quiescence).
    drop_losing: bool,
    skip_quiets: bool,
    killers: [Move; 2],
    counter: Move,
    current: Move,
    current_see: Option<(i32, bool)>,
    legal_count: Option<usize>,
}

impl MovePicker {
    fn empty(drop_losing: bool) -> Self {
        Self {
            moves: [Move::NULL; MAX_MOVES],
            scores: [0; MAX_MOVES],
            kinds: [Kind::Quiet; MAX_MOVES],
            len: 0,
            generated: 0,
            cursor: 0,
            drop_losing,
            skip_quiets: false,
            killers: [Move::NULL; 2],
            counter: Move::NULL,
            current: Move::NULL,
            current_see: None,
            legal_count: None,
        }
    }

    fn push<P: Position>(&mut self, pos: &P, mv: Move, quiet_score: impl Fn(Move) -> i32) {
        let i = self.len;
        self.moves[i] = mv;

        let victim = pos.captured_piece(mv);
        if victim.is_some() || mv.promotion().is_some() {
            let attacker = pos.moved_piece(mv);
            self.scores[i] = GOOD_TACTICAL + mvv_lva(victim, attacker, mv.promotion());
            let needs_see = match (victim, attacker) {
                (Some(v), Some(a)) => a.value() > v.value(),
                _ => false,
            };
            self.kinds[i] = if needs_see { Kind::Unverified } else { Kind::Tactical };
        } else {
            self.scores[i] = quiet_score(mv);
            self.kinds[i] = Kind::Quiet;
        }
        self.len += 1;
    }

    fn promote_tt_move(&mut self, tt_move: Move) {
        if tt_move.is_null() {
            return;
        }
        if let Some(i) = self.moves[..self.len].iter().position(|&m| m == tt_move) {
            self.scores[i] = TT_MOVE;
            if self.kinds[i] == Kind::Unverified {
                self.kinds[i] = Kind::Tactical;
            }
        }
    }

    /// Picker over every move of a full-width node.
    ///
    /// `tt_move` is searched first only if the generator produced it, which
    /// screens out moves from hash collisions.
    pub fn new<P: Position>(
        pos: &P,
        tt_move: Move,
        history: &HistoryHeuristics,
        ply: usize,
        prev: Option<MoveContext>,
    ) -> Self {
        let mut list = MoveList::new();
        pos.generate(GenKind::PseudoLegal, &mut list);

        let mut picker = Self::empty(false);
        let (k1, k2, counter) = history.special_moves(ply, prev);
        picker.killers = [k1, k2];
        picker.counter = counter;

        for &mv in &list {
            picker.push(pos, mv, |mv| {
                if mv == k1 {
                    KILLER_1
                } else if mv == k2 {
                    KILLER_2
                } else if mv == counter {
                    COUNTER
                } else {
                    history.score(pos, mv, prev)
                }
            });
        }
        picker.generated = picker.len;
        picker.promote_tt_move(tt_move);
        picker
    }

    /// Picker for quiescence search.
    ///
    /// Outside check it yields captures and promotions that do not lose
    /// material, optionally restricted to moves landing on `recapture`. In
    /// check it yields every evasion so mate can still be detected.
    pub fn tactical<P: Position>(pos: &P, tt_move: Move, recapture: Option<Square>) -> Self {
        let mut list = MoveList::new();
        pos.generate(GenKind::Tactical, &mut list);

        let in_check = pos.in_check();
        let mut picker = Self::empty(!in_check);

        for &mv in &list {
            if !in_check && recapture.is_some_and(|sq| mv.to() != sq) {
                continue;
            }
            picker.push(pos, mv, |_| 0);
        }
        picker.generated = picker.len;
        picker.promote_tt_move(tt_move);
        picker
    }

    /// Stop yielding quiet moves (late move pruning kicked in).
    pub fn skip_quiets(&mut self) {
        self.skip_quiets = true;
    }

    /// Yield the next move, best first.
    pub fn next<P: Position>(&mut self, pos: &P) -> Option<Move> {
        loop {
            let mut best: Option<usize> = None;
            for i in self.cursor..self.len {
                if self.skip_quiets && self.kinds[i] == Kind::Quiet && self.scores[i] != TT_MOVE {
                    continue;
                }
                if best.is_none_or(|b| self.scores[i] > self.scores[b]) {
                    best = Some(i);
                }
            }
            let idx = best?;

            if self.kinds[idx] == Kind::Unverified {
                self.kinds[idx] = Kind::Tactical;
                if !pos.see(self.moves[idx], 0) {
                    if self.drop_losing {
                        self.len -= 1;
                        self.moves.swap(idx, self.len);
                        self.scores.swap(idx, self.len);
                        self.kinds.swap(idx, self.len);
                    } else {
                        self.scores[idx] += BAD_TACTICAL - GOOD_TACTICAL;
                    }
                    continue;
                }
                self.moves.swap(self.cursor, idx);
                self.scores.swap(self.cursor, idx);
                self.kinds.swap(self.cursor, idx);
                return Some(self.select(Some((0, true))));
            }

            self.moves.swap(self.cursor, idx);
            self.scores.swap(self.cursor, idx);
            self.kinds.swap(self.cursor, idx);
            return Some(self.select(None));
        }
    }

    fn select(&mut self, see: Option<(i32, bool)>) -> Move {
        let mv = self.moves[self.cursor];
        self.cursor += 1;
        self.current = mv;
        self.current_see = see;
        mv
    }

    /// Whether the last yielded move wins at least `threshold` in exchanges.
    ///
    /// The most recent answer is cached, so repeated questions about the
    /// same move and threshold cost nothing.
    pub fn see<P: Position>(&mut self, pos: &P, threshold: i32) -> bool {
        match self.current_see {
            Some((t, result)) if t == threshold => result,
            // A move that wins at least `t` also wins any smaller threshold.
            Some((t, true)) if threshold <= t => true,
            _ => {
                let result = pos.see(self.current, threshold);
                self.current_see = Some((threshold, result));
                result
            }
        }
    }

    /// Whether the position has exactly one legal move.
    pub fn singular<P: Position>(&mut self, pos: &P) -> bool {
        let count = match self.legal_count {
            Some(count) => count,
            None => {
                let count = self.moves[..self.generated]
                    .iter()
                    .filter(|&&mv| pos.is_legal(mv))
                    .count();
                self.legal_count = Some(count);
                count
            }
        };
        count == 1
    }

    /// Whether `mv` is one of this node's killers or its counter move.
    pub fn is_refutation(&self, mv: Move) -> bool {
        !mv.is_null() && (self.killers.contains(&mv) || mv == self.counter)
    }
}

// ── LMR Table ─────────────────────────────────────────────────────────────────

/// LMR reduction table in 1024ths of a ply, indexed by [move_index][depth].
static LMR_TABLE: OnceLock<[[i32; 64]; 64]> = OnceLock::new();

fn lmr_table() -> &'static [[i32; 64]; 64] {
    LMR_TABLE.get_or_init(|| {
        let mut t = [[0i32; 64]; 64];
        for (i, row) in t.iter_mut().enumerate().skip(1) {
            for (d, cell) in row.iter_mut().enumerate().skip(1) {
                *cell = ((0.76 + (i as f64).ln() * (d as f64).ln() / 2.32) * 1024.0) as i32;
            }
        }
        t
    })
}

/// Late move reduction for the given move index and depth, in 1024ths of a ply.
pub fn lmr_reduction(move_index: usize, depth: i32) -> i32 {
    lmr_table()[move_index.min(63)][depth.clamp(0, 63) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pawn_takes_queen_beats_queen_takes_pawn() {
        let pxq = mvv_lva(Some(PieceKind::Queen), Some(PieceKind::Pawn), None);
        let qxp = mvv_lva(Some(PieceKind::Pawn), Some(PieceKind::Queen), None);
        assert!(pxq > qxp);
    }

    #[test]
    fn lighter_attacker_preferred_for_same_victim() {
        let pxr = mvv_lva(Some(PieceKind::Rook), Some(PieceKind::Pawn), None);
        let nxr = mvv_lva(Some(PieceKind::Rook), Some(PieceKind::Knight), None);
        let qxr = mvv_lva(Some(PieceKind::Rook), Some(PieceKind::Queen), None);
        assert!(pxr > nxr);
        assert!(nxr > qxr);
    }

    #[test]
    fn queen_promotion_beats_minor_capture() {
        let promo = mvv_lva(None, Some(PieceKind::Pawn), Some(PieceKind::Queen));
        let nxb = mvv_lva(Some(PieceKind::Bishop), Some(PieceKind::Knight), None);
        assert!(promo > nxb);
    }

    #[test]
    fn bands_are_disjoint() {
        let best_tactical = mvv_lva(Some(PieceKind::Queen), Some(PieceKind::Pawn), Some(PieceKind::Queen));
        assert!(GOOD_TACTICAL + best_tactical < TT_MOVE);
        assert!(GOOD_TACTICAL > KILLER_1);
        assert!(COUNTER > BAD_TACTICAL + best_tactical);
        assert!(BAD_TACTICAL > 2 * 16_384);
    }

    #[test]
    fn lmr_reduction_increases_with_depth_and_moves() {
        assert!(lmr_reduction(10, 5) > lmr_reduction(5, 5));
        assert!(lmr_reduction(5, 10) > lmr_reduction(5, 5));
        assert_eq!(lmr_reduction(0, 10), 0);
        assert_eq!(lmr_reduction(200, 200), lmr_reduction(63, 63));
    }
}

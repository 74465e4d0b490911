//! Quiet-move statistics: killers, counter moves, butterfly and continuation history.
//!
//! Nothing here affects the correctness of a search, only the order in which
//! moves are tried.

use crate::position::Position;
use crate::score::MAX_PLY;
use crate::types::{Color, Move, PieceKind, Square};

/// Saturation bound for every history value.
const HISTORY_CAP: i32 = 16_384;

/// Largest single bonus, reached from depth 7 upward.
const MAX_BONUS: i32 = 1_600;

const PIECE_SQUARES: usize = PieceKind::COUNT * 64;

/// The move that led to the current node, as seen by the side to move now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveContext {
    /// Piece that moved (the promoted piece keeps its pawn identity).
    pub piece: PieceKind,
    /// Destination square.
    pub to: Square,
    /// Whether the move captured something.
    pub capture: bool,
}

/// Depth-scaled reward/penalty magnitude.
#[inline]
pub fn history_bonus(depth: i32) -> i32 {
    (32 * depth * depth).min(MAX_BONUS)
}

/// Saturating update: `v += bonus - v * |bonus| / CAP`.
#[inline]
fn apply(entry: &mut i16, bonus: i32) {
    let v = *entry as i32;
    let updated = v + bonus - v * bonus.abs() / HISTORY_CAP;
    *entry = updated.clamp(-HISTORY_CAP, HISTORY_CAP) as i16;
}

/// All ordering statistics kept for the lifetime of a game.
pub struct HistoryHeuristics {
    /// `[side][from][to]`
    butterfly: [[[i16; 64]; 64]; 2],
    /// Flat `[prev_piece][prev_to][piece][to]`.
    continuation: Vec<i16>,
    /// `[prev_was_capture][prev_piece][prev_to]`
    counters: [[[Move; 64]; PieceKind::COUNT]; 2],
    killers: [[Move; 2]; MAX_PLY],
}

impl HistoryHeuristics {
    /// Create empty tables.
    pub fn new() -> Self {
        Self {
            butterfly: [[[0; 64]; 64]; 2],
            continuation: vec![0; PIECE_SQUARES * PIECE_SQUARES],
            counters: [[[Move::NULL; 64]; PieceKind::COUNT]; 2],
            killers: [[Move::NULL; 2]; MAX_PLY],
        }
    }

    /// Forget everything (new game).
    pub fn clear(&mut self) {
        self.butterfly = [[[0; 64]; 64]; 2];
        self.continuation.fill(0);
        self.counters = [[[Move::NULL; 64]; PieceKind::COUNT]; 2];
        self.killers = [[Move::NULL; 2]; MAX_PLY];
    }

    /// Prepare for a new search of the same game.
    ///
    /// Killers refer to plies of the previous tree and are dropped; the
    /// history tables are halved so recent results dominate.
    pub fn new_search(&mut self) {
        self.killers = [[Move::NULL; 2]; MAX_PLY];
        for v in self.butterfly.iter_mut().flatten().flatten() {
            *v /= 2;
        }
        for v in self.continuation.iter_mut() {
            *v /= 2;
        }
    }

    fn continuation_index(prev: MoveContext, piece: PieceKind, to: Square) -> usize {
        (prev.piece.index() * 64 + prev.to.index()) * PIECE_SQUARES + piece.index() * 64 + to.index()
    }

    /// The two killers stored for `ply`, most recent first.
    pub fn killers(&self, ply: usize) -> [Move; 2] {
        self.killers.get(ply).copied().unwrap_or([Move::NULL; 2])
    }

    /// The recorded refutation of the previous move.
    pub fn counter(&self, prev: Option<MoveContext>) -> Move {
        match prev {
            Some(p) => self.counters[p.capture as usize][p.piece.index()][p.to.index()],
            None => Move::NULL,
        }
    }

    /// `(killer1, killer2, counter)` for a node.
    pub fn special_moves(&self, ply: usize, prev: Option<MoveContext>) -> (Move, Move, Move) {
        let [k1, k2] = self.killers(ply);
        (k1, k2, self.counter(prev))
    }

    /// Ordering score of a quiet move: butterfly plus continuation history.
    pub fn score<P: Position>(&self, pos: &P, mv: Move, prev: Option<MoveContext>) -> i32 {
        let side = pos.side_to_move();
        let mut score = self.butterfly[side.index()][mv.from().index()][mv.to().index()] as i32;
        if let (Some(p), Some(piece)) = (prev, pos.moved_piece(mv)) {
            score += self.continuation[Self::continuation_index(p, piece, mv.to())] as i32;
        }
        score
    }

    fn reward(&mut self, side: Color, piece: Option<PieceKind>, mv: Move, prev: Option<MoveContext>, bonus: i32) {
        apply(&mut self.butterfly[side.index()][mv.from().index()][mv.to().index()], bonus);
        if let (Some(p), Some(piece)) = (prev, piece) {
            let idx = Self::continuation_index(p, piece, mv.to());
            apply(&mut self.continuation[idx], bonus);
        }
    }

    /// Record a quiet fail-high at `ply`.
    ///
    /// `best` is rewarded and every other quiet move in `tried` is penalised,
    /// both scaled by `depth`. `best` also becomes the first killer and the
    /// counter move of `prev`.
    pub fn update<P: Position>(
        &mut self,
        pos: &P,
        ply: usize,
        depth: i32,
        best: Move,
        tried: &[Move],
        prev: Option<MoveContext>,
    ) {
        let side = pos.side_to_move();
        let bonus = history_bonus(depth);

        self.reward(side, pos.moved_piece(best), best, prev, bonus);
        for &mv in tried.iter().filter(|&&mv| mv != best) {
            self.reward(side, pos.moved_piece(mv), mv, prev, -bonus);
        }

        if let Some(slots) = self.killers.get_mut(ply) {
            if slots[0] != best {
                slots[1] = slots[0];
                slots[0] = best;
            }
        }

        if let Some(p) = prev {
            self.counters[p.capture as usize][p.piece.index()][p.to.index()] = best;
        }
    }
}

impl Default for HistoryHeuristics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HistoryHeuristics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryHeuristics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::GenKind;
    use crate::types::MoveList;

    /// Just enough of a position to drive the history tables.
    struct Stub {
        side: Color,
    }

    impl Position for Stub {
        fn side_to_move(&self) -> Color {
            self.side
        }
        fn in_check(&self) -> bool {
            false
        }
        fn key(&self) -> u64 {
            0
        }
        fn pawn_key(&self) -> u64 {
            0
        }
        fn make_move(&mut self, _: Move) {}
        fn unmake_move(&mut self, _: Move) {}
        fn make_null(&mut self) {}
        fn unmake_null(&mut self) {}
        fn is_legal(&self, _: Move) -> bool {
            true
        }
        fn gives_check(&self, _: Move) -> bool {
            false
        }
        fn see(&self, _: Move, threshold: i32) -> bool {
            threshold <= 0
        }
        fn is_draw(&self) -> bool {
            false
        }
        fn non_pawn_material(&self, _: Color) -> bool {
            true
        }
        fn generate(&self, _: GenKind, _: &mut MoveList) {}
        fn moved_piece(&self, mv: Move) -> Option<PieceKind> {
            Some(if mv.from().rank() == 1 { PieceKind::Pawn } else { PieceKind::Knight })
        }
        fn captured_piece(&self, _: Move) -> Option<PieceKind> {
            None
        }
    }

    fn mv(s: &str) -> Move {
        Move::from_uci(s).unwrap()
    }

    fn prev_knight_f6() -> Option<MoveContext> {
        Some(MoveContext {
            piece: PieceKind::Knight,
            to: Square::from_algebraic("f6").unwrap(),
            capture: false,
        })
    }

    #[test]
    fn saturating_update_stays_bounded() {
        let mut v = 0i16;
        for _ in 0..10_000 {
            apply(&mut v, MAX_BONUS);
        }
        assert!(v as i32 <= HISTORY_CAP);
        assert!(v as i32 > HISTORY_CAP - MAX_BONUS);

        for _ in 0..10_000 {
            apply(&mut v, -MAX_BONUS);
        }
        assert!(v as i32 >= -HISTORY_CAP);
        assert!((v as i32) < -HISTORY_CAP + MAX_BONUS);
    }

    #[test]
    fn update_decays_toward_zero_gradually() {
        let mut v = 10_000i16;
        apply(&mut v, -100);
        // 10000 - 100 - 10000*100/16384
        assert_eq!(v, 10_000 - 100 - 61);
    }

    #[test]
    fn bonus_grows_with_depth_and_is_capped() {
        assert!(history_bonus(3) > history_bonus(2));
        assert_eq!(history_bonus(40), MAX_BONUS);
    }

    #[test]
    fn best_rewarded_siblings_penalised() {
        let pos = Stub { side: Color::White };
        let mut h = HistoryHeuristics::new();
        let best = mv("g1f3");
        let other = mv("b1c3");

        h.update(&pos, 2, 4, best, &[other, best], None);

        assert!(h.score(&pos, best, None) > 0);
        assert!(h.score(&pos, other, None) < 0);
        // Other side is untouched.
        let black = Stub { side: Color::Black };
        assert_eq!(h.score(&black, best, None), 0);
    }

    #[test]
    fn continuation_history_depends_on_previous_move() {
        let pos = Stub { side: Color::White };
        let mut h = HistoryHeuristics::new();
        let best = mv("g1f3");

        h.update(&pos, 0, 5, best, &[best], prev_knight_f6());

        let with_context = h.score(&pos, best, prev_knight_f6());
        let without = h.score(&pos, best, None);
        assert!(with_context > without);
        assert!(without > 0);
    }

    #[test]
    fn killers_most_recent_first() {
        let pos = Stub { side: Color::White };
        let mut h = HistoryHeuristics::new();
        let a = mv("e2e4");
        let b = mv("d2d4");

        h.update(&pos, 5, 3, a, &[a], None);
        assert_eq!(h.killers(5), [a, Move::NULL]);

        h.update(&pos, 5, 3, b, &[b], None);
        assert_eq!(h.killers(5), [b, a]);

        // Same move again does not shift.
        h.update(&pos, 5, 3, b, &[b], None);
        assert_eq!(h.killers(5), [b, a]);

        assert_eq!(h.killers(4), [Move::NULL; 2]);
        assert_eq!(h.killers(MAX_PLY + 3), [Move::NULL; 2]);
    }

    #[test]
    fn counter_move_keyed_by_previous_move() {
        let pos = Stub { side: Color::Black };
        let mut h = HistoryHeuristics::new();
        let reply = mv("g8f6");

        h.update(&pos, 1, 2, reply, &[reply], prev_knight_f6());
        assert_eq!(h.counter(prev_knight_f6()), reply);

        let as_capture = prev_knight_f6().map(|p| MoveContext { capture: true, ..p });
        assert_eq!(h.counter(as_capture), Move::NULL);
        assert_eq!(h.special_moves(1, prev_knight_f6()), (reply, Move::NULL, reply));
    }

    #[test]
    fn new_search_drops_killers_and_halves_history() {
        let pos = Stub { side: Color::White };
        let mut h = HistoryHeuristics::new();
        let best = mv("g1f3");
        h.update(&pos, 0, 4, best, &[best], None);
        let before = h.score(&pos, best, None);

        h.new_search();

        assert_eq!(h.killers(0), [Move::NULL; 2]);
        assert_eq!(h.score(&pos, best, None), before / 2);

        h.clear();
        assert_eq!(h.score(&pos, best, None), 0);
    }
}

//! Contracts the search consumes from its collaborators.
//!
//! The engine never looks inside a board. Everything it needs (move
//! generation, legality, reversible make/unmake, exchange evaluation, draw
//! detection and hashing) goes through [`Position`], and static evaluation goes
//! through [`Evaluator`].

use crate::types::{Color, Move, MoveList, PieceKind};

/// Which moves [`Position::generate`] should produce.
///
/// When the side to move is in check every kind yields the full set of
/// check evasions instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenKind {
    /// Every move that obeys piece movement rules; may leave the king in check.
    PseudoLegal,
    /// Captures and promotions only.
    Tactical,
    /// Strictly legal moves.
    Legal,
}

/// A game position with reversible move application.
pub trait Position {
    /// Side to move.
    fn side_to_move(&self) -> Color;

    /// Whether the side to move is in check.
    fn in_check(&self) -> bool;

    /// Full 64-bit Zobrist key of the position.
    fn key(&self) -> u64;

    /// Key covering pawn structure only.
    fn pawn_key(&self) -> u64;

    /// Play `mv`. The move must be legal in the current position.
    fn make_move(&mut self, mv: Move);

    /// Take back `mv`, which must be the last move made.
    fn unmake_move(&mut self, mv: Move);

    /// Pass the turn. Never called while in check.
    fn make_null(&mut self);

    /// Take back the last null move.
    fn unmake_null(&mut self);

    /// Whether a (possibly stale or pseudo-legal) move is legal here.
    fn is_legal(&self, mv: Move) -> bool;

    /// Whether a legal move gives check.
    fn gives_check(&self, mv: Move) -> bool;

    /// Static exchange evaluation: does `mv` win at least `threshold` centipawns?
    fn see(&self, mv: Move, threshold: i32) -> bool;

    /// Fifty-move rule, insufficient material or repetition.
    fn is_draw(&self) -> bool;

    /// Whether `side` has any piece other than pawns and the king.
    fn non_pawn_material(&self, side: Color) -> bool;

    /// Append moves of the requested kind to `list`.
    fn generate(&self, kind: GenKind, list: &mut MoveList);

    /// The piece standing on the move's source square.
    fn moved_piece(&self, mv: Move) -> Option<PieceKind>;

    /// The piece the move removes from the board, en passant included.
    fn captured_piece(&self, mv: Move) -> Option<PieceKind>;

    /// Captures and promotions.
    fn is_tactical(&self, mv: Move) -> bool {
        mv.promotion().is_some() || self.captured_piece(mv).is_some()
    }
}

/// Static evaluation of a position, from the side to move's point of view.
pub trait Evaluator<P: Position> {
    /// Score in centipawns. Must be a pure function of the position.
    fn evaluate(&self, pos: &P) -> i32;

    /// Bonus the evaluation grants the side to move.
    ///
    /// After a null move the search reuses the parent's evaluation,
    /// negated, plus twice this value.
    fn tempo(&self) -> i32 {
        0
    }
}

impl<P: Position, E: Evaluator<P> + ?Sized> Evaluator<P> for &E {
    fn evaluate(&self, pos: &P) -> i32 {
        (**self).evaluate(pos)
    }

    fn tempo(&self) -> i32 {
        (**self).tempo()
    }
}

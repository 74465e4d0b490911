//! Hand-crafted evaluation: material and piece-square tables, tapered by
//! game phase.

pub mod material;
pub mod phase;
pub mod pst;
pub mod score;

use quiver_engine::Evaluator;
use shakmaty::{Board, Color, Position as _};

use crate::position::ChessPosition;
use material::material;
use phase::{MAX_PHASE, game_phase};
use pst::pst_value;
use score::Score;

/// Bonus for having the move.
pub const DEFAULT_TEMPO: i32 = 10;

/// Static evaluator for [`ChessPosition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChessEvaluator {
    tempo: i32,
}

impl ChessEvaluator {
    pub fn new(tempo: i32) -> Self {
        Self { tempo }
    }
}

impl Default for ChessEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPO)
    }
}

/// Everything one side owns: material plus square bonuses.
fn side_score(board: &Board, color: Color) -> Score {
    let mut score = material(board, color);
    for sq in board.by_color(color) {
        if let Some(role) = board.role_at(sq) {
            score += pst_value(role, color, sq);
        }
    }
    score
}

/// Evaluation from White's point of view, without tempo.
pub fn evaluate_white(board: &Board) -> i32 {
    let score = side_score(board, Color::White) - side_score(board, Color::Black);
    score.taper(game_phase(board), MAX_PHASE)
}

impl Evaluator<ChessPosition> for ChessEvaluator {
    fn evaluate(&self, pos: &ChessPosition) -> i32 {
        let white = evaluate_white(pos.chess().board());
        let relative = match pos.chess().turn() {
            Color::White => white,
            Color::Black => -white,
        };
        relative + self.tempo
    }

    fn tempo(&self) -> i32 {
        self.tempo
    }
}

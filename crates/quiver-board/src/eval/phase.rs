//! Game phase from the non-pawn material left on the board.

use shakmaty::{Board, Role};

/// Phase of the starting position.
pub const MAX_PHASE: i32 = 24;

const WEIGHTS: [(Role, i32); 4] = [(Role::Knight, 1), (Role::Bishop, 1), (Role::Rook, 2), (Role::Queen, 4)];

/// `MAX_PHASE` with a full set of pieces, 0 with only kings and pawns.
/// Promotions cannot push it past the maximum.
pub fn game_phase(board: &Board) -> i32 {
    let phase: i32 = WEIGHTS
        .iter()
        .map(|&(role, weight)| board.by_role(role).count() as i32 * weight)
        .sum();
    phase.min(MAX_PHASE)
}

//! Static exchange evaluation.
//!
//! Plays out the capture sequence on the destination square with each side
//! using its least valuable attacker, and lets either side stop when going
//! on would cost material.

use shakmaty::attacks::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks};
use shakmaty::{Bitboard, Board, Chess, Color, Move, Position as _, Role, Square};

use crate::position::kind_of;

/// Longest exchange tracked; there are at most 32 pieces on the board.
const MAX_EXCHANGE: usize = 32;

fn value(role: Role) -> i32 {
    kind_of(role).value()
}

fn attackers_to(board: &Board, sq: Square, occupied: Bitboard) -> Bitboard {
    let diagonal = board.by_role(Role::Bishop) | board.by_role(Role::Queen);
    let straight = board.by_role(Role::Rook) | board.by_role(Role::Queen);
    let pawns = board.by_role(Role::Pawn);

    (knight_attacks(sq) & board.by_role(Role::Knight))
        | (king_attacks(sq) & board.by_role(Role::King))
        | (bishop_attacks(sq, occupied) & diagonal)
        | (rook_attacks(sq, occupied) & straight)
        | (pawn_attacks(Color::Black, sq) & pawns & board.by_color(Color::White))
        | (pawn_attacks(Color::White, sq) & pawns & board.by_color(Color::Black))
}

fn least_valuable(board: &Board, candidates: Bitboard) -> Option<(Square, Role)> {
    [Role::Pawn, Role::Knight, Role::Bishop, Role::Rook, Role::Queen, Role::King]
        .into_iter()
        .find_map(|role| (candidates & board.by_role(role)).first().map(|sq| (sq, role)))
}

/// Net material the side to move gains by playing `m` and continuing the
/// exchange optimally. Castling and drops are worth nothing.
pub fn see(pos: &Chess, m: &Move) -> i32 {
    let board = pos.board();
    let (from, to, mover, victim, promotion) = match *m {
        Move::Normal {
            role,
            from,
            capture,
            to,
            promotion,
        } => (from, to, role, capture, promotion),
        Move::EnPassant { from, to } => (from, to, Role::Pawn, Some(Role::Pawn), None),
        Move::Castle { .. } | Move::Put { .. } => return 0,
    };

    let mut occupied = board.occupied() & !Bitboard::from_square(from);
    if let Move::EnPassant { .. } = *m {
        let captured = Square::from_coords(to.file(), from.rank());
        occupied &= !Bitboard::from_square(captured);
    }

    let mut gain = [0i32; MAX_EXCHANGE];
    gain[0] = victim.map_or(0, value);
    let mut on_square = value(mover);
    if let Some(promoted) = promotion {
        gain[0] += value(promoted) - value(Role::Pawn);
        on_square = value(promoted);
    }

    let mut side = !pos.turn();
    let mut attackers = attackers_to(board, to, occupied) & occupied;
    let mut depth = 0;

    while let Some((sq, role)) = least_valuable(board, attackers & board.by_color(side)) {
        // The king may only take last.
        if role == Role::King && (attackers & board.by_color(!side)).any() {
            break;
        }
        depth += 1;
        if depth >= MAX_EXCHANGE {
            break;
        }
        gain[depth] = on_square - gain[depth - 1];
        on_square = value(role);

        occupied &= !Bitboard::from_square(sq);
        // Removing a piece may open a slider behind it.
        attackers = attackers_to(board, to, occupied) & occupied;
        side = !side;
    }

    while depth > 0 {
        depth -= 1;
        gain[depth] = -(-gain[depth]).max(gain[depth + 1]);
    }
    gain[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChessPosition;
    use quiver_engine::{Move as EngineMove, Position};

    fn see_of(fen: &str, uci: &str) -> i32 {
        let pos = ChessPosition::from_fen(fen).unwrap();
        let m = pos.board_move(EngineMove::from_uci(uci).unwrap()).unwrap();
        see(pos.chess(), &m)
    }

    #[test]
    fn free_piece() {
        assert_eq!(see_of("4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1", "e4d5"), 320);
    }

    #[test]
    fn defended_piece_by_pawn() {
        assert_eq!(see_of("4k3/8/4p3/3n4/4P3/8/8/4K3 w - - 0 1", "e4d5"), 220);
    }

    #[test]
    fn queen_for_pawn_loses() {
        assert_eq!(see_of("7k/8/3p4/2p5/8/4Q3/8/4K3 w - - 0 1", "e3c5"), 100 - 900);
    }

    #[test]
    fn xray_rook_behind_rook() {
        // A lone rook is lost for the pawn; a second rook behind it wins the exchange back.
        assert_eq!(see_of("3rk3/8/8/3p4/8/8/8/3R2K1 w - - 0 1", "d1d5"), 100 - 500);
        assert_eq!(see_of("3rk3/8/8/3p4/8/8/3R4/3R2K1 w - - 0 1", "d2d5"), 100);
    }

    #[test]
    fn king_cannot_recapture_into_defence() {
        // The queen backs up Rxe7, so the king may not take back.
        assert_eq!(see_of("4k3/4p3/8/8/8/8/4R3/4QK2 w - - 0 1", "e2e7"), 100);
    }

    #[test]
    fn en_passant_and_quiet_moves() {
        assert_eq!(see_of("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1", "e5d6"), 100);
        assert_eq!(see_of("4k3/8/8/8/8/8/8/4K1N1 w - - 0 1", "g1f3"), 0);
    }

    #[test]
    fn threshold_form_through_position() {
        let pos = ChessPosition::from_fen("4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let mv = EngineMove::from_uci("e4d5").unwrap();
        assert!(pos.see(mv, 0));
        assert!(pos.see(mv, 320));
        assert!(!pos.see(mv, 321));
    }
}

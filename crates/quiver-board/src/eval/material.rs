//! Material balance with a bishop-pair bonus.

use shakmaty::{Board, Color, Role};

use super::score::{S, Score};

/// Piece values by role, king last and worthless.
pub const PIECE_VALUE: [(Role, Score); 5] = [
    (Role::Pawn, S(90, 115)),
    (Role::Knight, S(325, 300)),
    (Role::Bishop, S(335, 315)),
    (Role::Rook, S(480, 530)),
    (Role::Queen, S(950, 960)),
];

const BISHOP_PAIR: Score = S(40, 55);

/// Material for `color` alone.
pub fn material(board: &Board, color: Color) -> Score {
    let ours = board.by_color(color);
    let mut score = Score::ZERO;
    for (role, value) in PIECE_VALUE {
        score += value * (board.by_role(role) & ours).count() as i16;
    }
    if (board.by_role(Role::Bishop) & ours).count() >= 2 {
        score += BISHOP_PAIR;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::fen::Fen;

    fn board(fen: &str) -> Board {
        fen.parse::<Fen>().unwrap().into_setup().board
    }

    #[test]
    fn lone_kings_have_nothing() {
        let b = board("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(material(&b, Color::White), Score::ZERO);
    }

    #[test]
    fn two_bishops_earn_the_pair() {
        let b = board("4k3/8/8/8/8/8/8/2B1KB2 w - - 0 1");
        assert_eq!(material(&b, Color::White), S(335, 315) * 2 + BISHOP_PAIR);
        let b = board("4k3/8/8/8/8/8/8/2N1KB2 w - - 0 1");
        assert_eq!(material(&b, Color::White), S(325, 300) + S(335, 315));
    }
}

//! Piece-square tables.
//!
//! Written from White's side with a1 first, so each row below is one rank
//! starting from rank 1. Black squares are mirrored vertically.

use shakmaty::{Color, Role, Square};

use super::score::Score;

/// Same value in both game phases.
const fn flat(table: [i16; 64]) -> [Score; 64] {
    let mut out = [Score::ZERO; 64];
    let mut i = 0;
    while i < 64 {
        out[i] = Score::new(table[i], table[i]);
        i += 1;
    }
    out
}

const fn phased(mg: [i16; 64], eg: [i16; 64]) -> [Score; 64] {
    let mut out = [Score::ZERO; 64];
    let mut i = 0;
    while i < 64 {
        out[i] = Score::new(mg[i], eg[i]);
        i += 1;
    }
    out
}

#[rustfmt::skip]
const PAWN: [Score; 64] = phased(
    [
          0,   0,   0,   0,   0,   0,   0,   0,
          0,   5,   5, -15, -15,   5,   5,   0,
          0,  -5,  -5,   5,   5,  -5,  -5,   0,
          0,   0,  10,  20,  20,  10,   0,   0,
          5,   5,  15,  25,  25,  15,   5,   5,
         15,  15,  25,  35,  35,  25,  15,  15,
         60,  60,  60,  60,  60,  60,  60,  60,
          0,   0,   0,   0,   0,   0,   0,   0,
    ],
    [
          0,   0,   0,   0,   0,   0,   0,   0,
        -10, -10, -10, -10, -10, -10, -10, -10,
         -5,  -5,  -5,  -5,  -5,  -5,  -5,  -5,
          5,   5,   5,   5,   5,   5,   5,   5,
         20,  20,  20,  20,  20,  20,  20,  20,
         45,  45,  45,  45,  45,  45,  45,  45,
        110, 110, 110, 110, 110, 110, 110, 110,
          0,   0,   0,   0,   0,   0,   0,   0,
    ],
);

#[rustfmt::skip]
const KNIGHT: [Score; 64] = flat([
    -45, -30, -25, -20, -20, -25, -30, -45,
    -30, -15,   0,   5,   5,   0, -15, -30,
    -20,   5,  10,  15,  15,  10,   5, -20,
    -20,   0,  15,  20,  20,  15,   0, -20,
    -20,   5,  15,  25,  25,  15,   5, -20,
    -20,   0,  15,  20,  20,  15,   0, -20,
    -30, -15,   0,   0,   0,   0, -15, -30,
    -45, -30, -25, -20, -20, -25, -30, -45,
]);

#[rustfmt::skip]
const BISHOP: [Score; 64] = flat([
    -15,  -5, -10,  -5,  -5, -10,  -5, -15,
     -5,  10,   5,   5,   5,   5,  10,  -5,
     -5,  10,  10,  10,  10,  10,  10,  -5,
     -5,   5,  10,  15,  15,  10,   5,  -5,
     -5,  10,  10,  15,  15,  10,  10,  -5,
     -5,   5,  10,  10,  10,  10,   5,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
    -15,  -5,  -5,  -5,  -5,  -5,  -5, -15,
]);

#[rustfmt::skip]
const ROOK: [Score; 64] = flat([
      0,   0,   5,  10,  10,   5,   0,   0,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
     -5,   0,   0,   0,   0,   0,   0,  -5,
      0,   5,   5,   5,   5,   5,   5,   0,
     15,  20,  20,  20,  20,  20,  20,  15,
      5,   5,   5,   5,   5,   5,   5,   5,
]);

#[rustfmt::skip]
const QUEEN: [Score; 64] = flat([
    -20, -10, -10,  -5,  -5, -10, -10, -20,
    -10,   0,   5,   0,   0,   0,   0, -10,
    -10,   5,   5,   5,   5,   5,   0, -10,
     -5,   0,   5,   5,   5,   5,   0,  -5,
     -5,   0,   5,   5,   5,   5,   0,  -5,
    -10,   0,   5,   5,   5,   5,   0, -10,
    -10,   0,   0,   0,   0,   0,   0, -10,
    -20, -10, -10,  -5,  -5, -10, -10, -20,
]);

#[rustfmt::skip]
const KING: [Score; 64] = phased(
    [
         20,  30,  10, -10,   0, -10,  30,  20,
         15,  15, -10, -20, -20, -10,  15,  15,
        -15, -25, -25, -30, -30, -25, -25, -15,
        -30, -40, -40, -50, -50, -40, -40, -30,
        -40, -50, -50, -60, -60, -50, -50, -40,
        -40, -50, -50, -60, -60, -50, -50, -40,
        -40, -50, -50, -60, -60, -50, -50, -40,
        -40, -50, -50, -60, -60, -50, -50, -40,
    ],
    [
        -50, -30, -25, -20, -20, -25, -30, -50,
        -30, -15,   0,   5,   5,   0, -15, -30,
        -25,   0,  15,  20,  20,  15,   0, -25,
        -20,   5,  20,  30,  30,  20,   5, -20,
        -20,   5,  20,  30,  30,  20,   5, -20,
        -25,   0,  15,  20,  20,  15,   0, -25,
        -30, -15,   0,   5,   5,   0, -15, -30,
        -50, -30, -25, -20, -20, -25, -30, -50,
    ],
);

fn table(role: Role) -> &'static [Score; 64] {
    match role {
        Role::Pawn => &PAWN,
        Role::Knight => &KNIGHT,
        Role::Bishop => &BISHOP,
        Role::Rook => &ROOK,
        Role::Queen => &QUEEN,
        Role::King => &KING,
    }
}

/// Square bonus for a `color` `role` standing on `sq`.
pub fn pst_value(role: Role, color: Color, sq: Square) -> Score {
    let index = u32::from(sq) as usize;
    let index = match color {
        Color::White => index,
        Color::Black => index ^ 56,
    };
    table(role)[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_mirrors_white() {
        for role in [Role::Pawn, Role::Knight, Role::King] {
            assert_eq!(
                pst_value(role, Color::White, Square::E2),
                pst_value(role, Color::Black, Square::E7)
            );
        }
    }

    #[test]
    fn central_knight_beats_corner_knight() {
        let centre = pst_value(Role::Knight, Color::White, Square::D4);
        let corner = pst_value(Role::Knight, Color::White, Square::A1);
        assert!(centre.mg() > corner.mg());
    }

    #[test]
    fn king_shelters_then_centralises() {
        let castled = pst_value(Role::King, Color::White, Square::G1);
        let centre = pst_value(Role::King, Color::White, Square::E4);
        assert!(castled.mg() > centre.mg());
        assert!(castled.eg() < centre.eg());
    }
}

//! Paired middlegame/endgame score.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A middlegame and an endgame value packed into one `i32`.
///
/// The endgame half sits in the low 16 bits and the middlegame half above
/// it, so addition and subtraction work on the packed word directly.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Score(i32);

impl Score {
    pub const ZERO: Score = Score(0);

    #[inline]
    pub const fn new(mg: i16, eg: i16) -> Score {
        Score(((mg as i32) << 16).wrapping_add(eg as i32))
    }

    #[inline]
    pub const fn mg(self) -> i16 {
        // Undo the borrow a negative endgame half takes from the upper half.
        (self.0.wrapping_add(0x8000) >> 16) as i16
    }

    #[inline]
    pub const fn eg(self) -> i16 {
        self.0 as i16
    }

    /// Blend the two halves by game phase: `phase == max` is pure middlegame.
    #[inline]
    pub fn taper(self, phase: i32, max: i32) -> i32 {
        (i32::from(self.mg()) * phase + i32::from(self.eg()) * (max - phase)) / max
    }
}

/// `S(mg, eg)`, the usual shorthand in evaluation tables.
#[allow(non_snake_case)]
#[inline]
pub const fn S(mg: i16, eg: i16) -> Score {
    Score::new(mg, eg)
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Score) -> Score {
        Score(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Score) {
        *self = *self + rhs;
    }
}

impl Sub for Score {
    type Output = Score;

    fn sub(self, rhs: Score) -> Score {
        Score(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Score {
    fn sub_assign(&mut self, rhs: Score) {
        *self = *self - rhs;
    }
}

impl Neg for Score {
    type Output = Score;

    fn neg(self) -> Score {
        Score::new(-self.mg(), -self.eg())
    }
}

impl Mul<i16> for Score {
    type Output = Score;

    fn mul(self, rhs: i16) -> Score {
        Score::new(self.mg() * rhs, self.eg() * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_survive_packing() {
        for (mg, eg) in [(0, 0), (25, -40), (-300, 12), (-1, -1), (900, 950)] {
            let s = S(mg, eg);
            assert_eq!((s.mg(), s.eg()), (mg, eg));
        }
    }

    #[test]
    fn arithmetic_is_per_half() {
        let a = S(100, -20);
        let b = S(-30, 50);
        assert_eq!(a + b, S(70, 30));
        assert_eq!(a - b, S(130, -70));
        assert_eq!(-a, S(-100, 20));
        assert_eq!(b * 3, S(-90, 150));
    }

    #[test]
    fn taper_blends_by_phase() {
        let s = S(100, 20);
        assert_eq!(s.taper(24, 24), 100);
        assert_eq!(s.taper(0, 24), 20);
        assert_eq!(s.taper(12, 24), 60);
    }
}

//! Triangular principal-variation table.

use crate::score::MAX_PLY;
use crate::types::Move;

/// Each row `ply` holds the best line found from that ply onward.
///
/// Lives inside the boxed search worker (~33 KB), so updates never allocate.
pub struct PvTable {
    moves: [[Move; MAX_PLY]; MAX_PLY],
    len: [usize; MAX_PLY],
}

impl PvTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            moves: [[Move::NULL; MAX_PLY]; MAX_PLY],
            len: [0; MAX_PLY],
        }
    }

    /// Forget the line at `ply` (called on entering a node).
    pub fn clear(&mut self, ply: usize) {
        if ply < MAX_PLY {
            self.len[ply] = 0;
        }
    }

    /// Make `mv` followed by the child's line the new line at `ply`.
    pub fn update(&mut self, ply: usize, mv: Move) {
        if ply >= MAX_PLY {
            return;
        }
        self.moves[ply][0] = mv;

        let child = ply + 1;
        if child < MAX_PLY {
            let copy_len = self.len[child].min(MAX_PLY - 1);
            let (top, bottom) = self.moves.split_at_mut(child);
            top[ply][1..1 + copy_len].copy_from_slice(&bottom[0][..copy_len]);
            self.len[ply] = 1 + copy_len;
        } else {
            self.len[ply] = 1;
        }
    }

    /// The line found at `ply`.
    pub fn line(&self, ply: usize) -> &[Move] {
        match self.len.get(ply) {
            Some(&len) => &self.moves[ply][..len],
            None => &[],
        }
    }
}

impl Default for PvTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(s: &str) -> Move {
        Move::from_uci(s).unwrap()
    }

    #[test]
    fn update_prepends_to_child_line() {
        let mut pv = PvTable::new();
        pv.clear(2);
        pv.update(2, mv("g8f6"));
        pv.update(1, mv("d2d4"));
        pv.update(0, mv("e2e4"));
        assert_eq!(pv.line(0), &[mv("e2e4"), mv("d2d4"), mv("g8f6")]);
        assert_eq!(pv.line(1), &[mv("d2d4"), mv("g8f6")]);
    }

    #[test]
    fn cleared_child_truncates_line() {
        let mut pv = PvTable::new();
        pv.update(1, mv("e7e5"));
        pv.update(0, mv("e2e4"));
        assert_eq!(pv.line(0).len(), 2);

        pv.clear(1);
        pv.update(0, mv("d2d4"));
        assert_eq!(pv.line(0), &[mv("d2d4")]);
    }

    #[test]
    fn deepest_ply_is_bounded() {
        let mut pv = PvTable::new();
        pv.update(MAX_PLY - 1, mv("a2a3"));
        assert_eq!(pv.line(MAX_PLY - 1), &[mv("a2a3")]);
        pv.update(MAX_PLY, mv("a2a3"));
        assert!(pv.line(MAX_PLY).is_empty());
    }
}

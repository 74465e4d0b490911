//! Score constants and mate-distance arithmetic.
//!
//! Mate scores are stored relative to the root while searching
//! (`MATE - plies_to_mate`) and relative to the node in the transposition
//! table, so a cached mate stays correct wherever it is reused.

/// Maximum search ply, used for array sizing and recursion limits.
pub const MAX_PLY: usize = 128;

/// Score of a drawn position.
pub const DRAW: i32 = 0;

/// Score for delivering mate on the spot.
pub const MATE: i32 = 32_000;

/// Bound wider than any reachable score.
pub const INFINITE: i32 = MATE + 1;

/// Marker for "no evaluation available" (in check, empty TT slot).
pub const NONE: i32 = MATE + 2;

/// Scores at or above this are forced mates for the side to move.
pub const MATE_IN_MAX_PLY: i32 = MATE - MAX_PLY as i32;

/// Scores at or below this are forced mates against the side to move.
pub const MATED_IN_MAX_PLY: i32 = -MATE_IN_MAX_PLY;

/// Score for mating `ply` plies from the root.
#[inline]
pub const fn mate_in(ply: usize) -> i32 {
    MATE - ply as i32
}

/// Score for being mated `ply` plies from the root.
#[inline]
pub const fn mated_in(ply: usize) -> i32 {
    -MATE + ply as i32
}

/// Whether the score is a forced mate for either side.
#[inline]
pub const fn is_mate(score: i32) -> bool {
    score.abs() >= MATE_IN_MAX_PLY && score.abs() <= MATE
}

/// Full moves until mate: positive when the side to move mates, negative
/// when it gets mated. `None` for ordinary scores.
pub fn mate_distance(score: i32) -> Option<i32> {
    if !is_mate(score) {
        return None;
    }
    Some(if score > 0 {
        (MATE - score + 1) / 2
    } else {
        -(MATE + score) / 2
    })
}

/// Convert a root-relative search score into node-relative TT form.
#[inline]
pub fn score_to_tt(score: i32, ply: usize) -> i32 {
    debug_assert!(score.abs() <= MATE, "score {score} outside the legal range");
    if score >= MATE_IN_MAX_PLY {
        score + ply as i32
    } else if score <= MATED_IN_MAX_PLY {
        score - ply as i32
    } else {
        score
    }
}

/// Reverse [`score_to_tt`] for a probe at `ply`.
#[inline]
pub fn score_from_tt(score: i32, ply: usize) -> i32 {
    let restored = if score >= MATE_IN_MAX_PLY {
        score - ply as i32
    } else if score <= MATED_IN_MAX_PLY {
        score + ply as i32
    } else {
        score
    };
    debug_assert!(restored.abs() <= MATE, "TT score {score} restores outside the legal range");
    restored
}

//! Clustered transposition table with XOR-verified lockless entries.
//!
//! Four 16-byte entries share one 64-byte cluster. A key selects its cluster
//! with its low bits and is recognised inside the cluster by its high 32 bits.
//!
//! ## Bit layout
//!
//! ```text
//! word0 (AtomicU64):
//!   bits 63-32: tag           (upper 32 bits of the Zobrist key)
//!   bits 31-16: move          (16 bits)
//!   bits 15-8:  depth         (stored + DEPTH_OFFSET)
//!   bits 7-2:   generation    (6 bits, wraps at 64)
//!   bits 1-0:   bound
//!
//! word1 (AtomicU64):
//!   bits 63-32: check         = tag XOR (word0 & 0xFFFF_FFFF)
//!   bits 31-16: score         (i16, node-relative)
//!   bits 15-0:  static eval   (i16)
//! ```
//!
//! A probe racing a store can observe word0 and word1 from different writes.
//! The check field catches that and the probe reports a miss.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use crate::score::{score_from_tt, score_to_tt};
use crate::types::Move;

/// Entries per cluster.
const CLUSTER_SIZE: usize = 4;

/// Offset that lets quiescence depths (down to -8) fit in an unsigned byte.
const DEPTH_OFFSET: i32 = 8;

const GENERATION_MASK: u8 = 0x3F;

/// Bound type stored in a TT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    /// Empty slot.
    None = 0,
    /// The true score is at most the stored one (fail-low).
    Upper = 1,
    /// The true score is at least the stored one (fail-high).
    Lower = 2,
    /// The stored score is exact.
    Exact = 3,
}

impl Bound {
    const fn from_bits(bits: u64) -> Self {
        match bits & 0x03 {
            1 => Bound::Upper,
            2 => Bound::Lower,
            3 => Bound::Exact,
            _ => Bound::None,
        }
    }

    /// Whether a stored `score` with this bound settles a search window.
    #[inline]
    pub fn cuts(self, score: i32, alpha: i32, beta: i32) -> bool {
        match self {
            Bound::Exact => true,
            Bound::Lower => score >= beta,
            Bound::Upper => score <= alpha,
            Bound::None => false,
        }
    }
}

/// Result of a successful probe.
#[derive(Debug, Clone, Copy)]
pub struct TtHit {
    /// Best move recorded for the position (may be null).
    pub mv: Move,
    /// Static evaluation recorded for the position.
    pub eval: i32,
    /// Score, converted back to root-relative form.
    pub score: i32,
    /// Remaining depth the score was searched to.
    pub depth: i32,
    /// Relationship between `score` and the true value.
    pub bound: Bound,
}

#[derive(Debug, Clone, Copy)]
struct Fields {
    tag: u32,
    mv: Move,
    depth: i32,
    generation: u8,
    bound: Bound,
}

fn pack_word0(f: Fields) -> u64 {
    let depth = (f.depth + DEPTH_OFFSET).clamp(0, u8::MAX as i32) as u64;
    ((f.tag as u64) << 32)
        | ((f.mv.raw() as u64) << 16)
        | (depth << 8)
        | (((f.generation & GENERATION_MASK) as u64) << 2)
        | f.bound as u64
}

fn unpack_word0(w0: u64) -> Fields {
    Fields {
        tag: (w0 >> 32) as u32,
        mv: Move::from_raw((w0 >> 16) as u16),
        depth: ((w0 >> 8) & 0xFF) as i32 - DEPTH_OFFSET,
        generation: ((w0 >> 2) as u8) & GENERATION_MASK,
        bound: Bound::from_bits(w0),
    }
}

fn pack_word1(w0: u64, score: i32, eval: i32) -> u64 {
    let check = ((w0 >> 32) ^ (w0 & 0xFFFF_FFFF)) << 32;
    let score = (score.clamp(i16::MIN as i32, i16::MAX as i32) as i16 as u16) as u64;
    let eval = (eval.clamp(i16::MIN as i32, i16::MAX as i32) as i16 as u16) as u64;
    check | (score << 16) | eval
}

/// Two 64-bit atomic words, one logical TT slot.
struct AtomicEntry {
    word0: AtomicU64,
    word1: AtomicU64,
}

impl AtomicEntry {
    const fn new() -> Self {
        Self {
            word0: AtomicU64::new(0),
            word1: AtomicU64::new(0),
        }
    }

    /// Load both words, or `None` if they come from different stores.
    fn load(&self) -> Option<(u64, u64)> {
        let w0 = self.word0.load(Ordering::Relaxed);
        let w1 = self.word1.load(Ordering::Relaxed);
        let expected = (w0 >> 32) ^ (w0 & 0xFFFF_FFFF);
        (expected == w1 >> 32).then_some((w0, w1))
    }

    fn store(&self, w0: u64, w1: u64) {
        self.word0.store(w0, Ordering::Relaxed);
        self.word1.store(w1, Ordering::Relaxed);
    }

    fn clear(&self) {
        self.store(0, 0);
    }
}

#[repr(align(64))]
struct Cluster {
    entries: [AtomicEntry; CLUSTER_SIZE],
}

impl Cluster {
    const fn new() -> Self {
        Self {
            entries: [
                AtomicEntry::new(),
                AtomicEntry::new(),
                AtomicEntry::new(),
                AtomicEntry::new(),
            ],
        }
    }
}

/// Fixed-capacity, replace-by-depth hash table of search results.
///
/// Methods that touch entries take `&self`; only resizing needs `&mut self`,
/// which keeps it between searches.
pub struct TranspositionTable {
    clusters: Box<[Cluster]>,
    /// Cluster index mask (`clusters.len() - 1`).
    mask: u64,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Create a table of at most `mb` megabytes.
    ///
    /// The cluster count is rounded down to a power of two (minimum one cluster).
    pub fn new(mb: usize) -> Self {
        let bytes = mb.saturating_mul(1024 * 1024);
        let wanted = (bytes / std::mem::size_of::<Cluster>()).max(1);
        let count = 1usize << (usize::BITS - 1 - wanted.leading_zeros());
        let clusters: Box<[Cluster]> = (0..count).map(|_| Cluster::new()).collect();

        Self {
            clusters,
            mask: (count - 1) as u64,
            generation: AtomicU8::new(0),
        }
    }

    /// Reallocate to `mb` megabytes. All entries are lost.
    pub fn resize(&mut self, mb: usize) {
        *self = Self::new(mb);
    }

    /// Clear all entries and reset the generation counter.
    pub fn clear(&self) {
        for cluster in self.clusters.iter() {
            for entry in &cluster.entries {
                entry.clear();
            }
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Number of entries the table can hold.
    pub fn capacity(&self) -> usize {
        self.clusters.len() * CLUSTER_SIZE
    }

    /// Advance the generation counter. Call once per search.
    pub fn new_search(&self) {
        let current = self.generation.load(Ordering::Relaxed);
        self.generation
            .store(current.wrapping_add(1) & GENERATION_MASK, Ordering::Relaxed);
    }

    fn current_generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    fn cluster(&self, key: u64) -> &Cluster {
        &self.clusters[(key & self.mask) as usize]
    }

    /// Look up `key` and return the cached result, converted for `ply`.
    ///
    /// A hit refreshes the entry's generation so it survives aging.
    pub fn probe(&self, key: u64, ply: usize) -> Option<TtHit> {
        let tag = (key >> 32) as u32;
        let generation = self.current_generation();

        for entry in &self.cluster(key).entries {
            let Some((w0, w1)) = entry.load() else {
                continue;
            };
            let mut fields = unpack_word0(w0);
            if fields.tag != tag || fields.bound == Bound::None {
                continue;
            }

            let score = (w1 >> 16) as u16 as i16 as i32;
            let eval = w1 as u16 as i16 as i32;

            if fields.generation != generation {
                fields.generation = generation;
                let refreshed = pack_word0(fields);
                entry.store(refreshed, pack_word1(refreshed, score, eval));
            }

            return Some(TtHit {
                mv: fields.mv,
                eval,
                score: score_from_tt(score, ply),
                depth: fields.depth,
                bound: fields.bound,
            });
        }

        None
    }

    /// Record a search result for `key` found at `ply`.
    ///
    /// Replacement: an entry with the same tag is updated in place, otherwise
    /// the entry with the lowest `depth - age` is overwritten. An update of a
    /// same-tag entry is dropped when the new bound is not exact and the old
    /// entry was searched at least two plies deeper.
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &self,
        key: u64,
        ply: usize,
        mv: Move,
        eval: i32,
        score: i32,
        depth: i32,
        bound: Bound,
    ) {
        let tag = (key >> 32) as u32;
        let generation = self.current_generation();
        let cluster = self.cluster(key);

        let mut victim = 0;
        let mut victim_worth = i32::MAX;
        let mut keep_move = Move::NULL;

        for (i, entry) in cluster.entries.iter().enumerate() {
            let old = unpack_word0(entry.word0.load(Ordering::Relaxed));

            if old.bound == Bound::None {
                if victim_worth > i32::MIN {
                    victim = i;
                    victim_worth = i32::MIN;
                }
                continue;
            }

            if old.tag == tag {
                if bound != Bound::Exact && depth + 1 < old.depth {
                    return;
                }
                victim = i;
                keep_move = old.mv;
                break;
            }

            let age = (generation.wrapping_sub(old.generation) & GENERATION_MASK) as i32;
            let worth = old.depth - age;
            if worth < victim_worth {
                victim = i;
                victim_worth = worth;
            }
        }

        let mv = if mv.is_null() { keep_move } else { mv };
        let w0 = pack_word0(Fields {
            tag,
            mv,
            depth,
            generation,
            bound,
        });
        let w1 = pack_word1(w0, score_to_tt(score, ply), eval);
        cluster.entries[victim].store(w0, w1);
    }

    /// Permille of sampled entries written during the current search.
    pub fn hashfull(&self) -> u32 {
        let generation = self.current_generation();
        let sample = self.clusters.len().min(250);
        let used: usize = self.clusters[..sample]
            .iter()
            .flat_map(|c| c.entries.iter())
            .filter(|e| {
                let f = unpack_word0(e.word0.load(Ordering::Relaxed));
                f.bound != Bound::None && f.generation == generation
            })
            .count();
        (used * 1000 / (sample * CLUSTER_SIZE)) as u32
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("entries", &self.capacity())
            .field("generation", &self.current_generation())
            .finish()
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{mate_in, mated_in};
    use crate::types::Square;

    fn mv(from: &str, to: &str) -> Move {
        Move::new(
            Square::from_algebraic(from).unwrap(),
            Square::from_algebraic(to).unwrap(),
        )
    }

    /// Keys that land in the same cluster with distinct tags.
    fn colliding_keys(tt: &TranspositionTable, n: u64) -> Vec<u64> {
        (1..=n).map(|i| (i << 32) | (0x55 & tt.mask)).collect()
    }

    #[test]
    fn cluster_is_one_cache_line() {
        assert_eq!(std::mem::size_of::<AtomicEntry>(), 16);
        assert_eq!(std::mem::size_of::<Cluster>(), 64);
    }

    #[test]
    fn capacity_is_power_of_two() {
        let tt = TranspositionTable::new(1);
        let clusters = tt.capacity() / CLUSTER_SIZE;
        assert!(clusters.is_power_of_two());
        assert_eq!(clusters, 1024 * 1024 / 64);
        assert_eq!(TranspositionTable::new(0).capacity(), CLUSTER_SIZE);
    }

    #[test]
    fn store_then_probe_returns_same_data() {
        let tt = TranspositionTable::new(1);
        let key = 0xDEAD_BEEF_1234_5678;
        let m = mv("e2", "e4");

        tt.store(key, 0, m, 35, 120, 7, Bound::Exact);

        let hit = tt.probe(key, 0).expect("stored entry should be found");
        assert_eq!(hit.mv, m);
        assert_eq!(hit.eval, 35);
        assert_eq!(hit.score, 120);
        assert_eq!(hit.depth, 7);
        assert_eq!(hit.bound, Bound::Exact);
    }

    #[test]
    fn quiescence_depths_survive_packing() {
        let tt = TranspositionTable::new(1);
        let key = 0x0102_0304_0506_0708;
        tt.store(key, 3, Move::NULL, 0, -20, -1, Bound::Upper);
        assert_eq!(tt.probe(key, 3).unwrap().depth, -1);
    }

    #[test]
    fn mate_scores_are_reused_at_other_plies() {
        let tt = TranspositionTable::new(1);
        let key = 0xABCD_0000_0000_1111;
        // Mate found 2 plies below a node at ply 4.
        tt.store(key, 4, mv("d1", "h5"), 0, mate_in(6), 3, Bound::Exact);
        assert_eq!(tt.probe(key, 4).unwrap().score, mate_in(6));
        assert_eq!(tt.probe(key, 10).unwrap().score, mate_in(12));

        tt.store(key, 4, mv("d1", "h5"), 0, mated_in(7), 3, Bound::Exact);
        assert_eq!(tt.probe(key, 1).unwrap().score, mated_in(4));
    }

    #[test]
    fn probe_miss_returns_none() {
        let tt = TranspositionTable::new(1);
        assert!(tt.probe(0x1234_5678_9ABC_DEF0, 0).is_none());
    }

    #[test]
    fn same_cluster_different_tag_is_a_miss() {
        let tt = TranspositionTable::new(1);
        let keys = colliding_keys(&tt, 2);
        tt.store(keys[0], 0, mv("e2", "e4"), 0, 10, 3, Bound::Exact);
        assert!(tt.probe(keys[1], 0).is_none());
        assert!(tt.probe(keys[0], 0).is_some());
    }

    #[test]
    fn cluster_holds_four_positions() {
        let tt = TranspositionTable::new(1);
        let keys = colliding_keys(&tt, 4);
        for (i, &key) in keys.iter().enumerate() {
            tt.store(key, 0, Move::NULL, 0, i as i32, 5, Bound::Exact);
        }
        for (i, &key) in keys.iter().enumerate() {
            assert_eq!(tt.probe(key, 0).unwrap().score, i as i32);
        }
    }

    #[test]
    fn shallowest_entry_is_replaced() {
        let tt = TranspositionTable::new(1);
        let keys = colliding_keys(&tt, 5);
        let depths = [9, 2, 7, 5];
        for (&key, &depth) in keys.iter().zip(&depths) {
            tt.store(key, 0, Move::NULL, 0, 0, depth, Bound::Exact);
        }

        tt.store(keys[4], 0, Move::NULL, 0, 0, 1, Bound::Lower);

        assert!(tt.probe(keys[1], 0).is_none(), "depth-2 entry should be evicted");
        for i in [0, 2, 3, 4] {
            assert!(tt.probe(keys[i], 0).is_some(), "key {i} should survive");
        }
    }

    #[test]
    fn stale_entries_lose_to_fresh_ones() {
        let tt = TranspositionTable::new(1);
        let keys = colliding_keys(&tt, 5);
        // Oldest entry is deepest, but ten searches old.
        tt.store(keys[0], 0, Move::NULL, 0, 0, 12, Bound::Exact);
        for _ in 0..10 {
            tt.new_search();
        }
        for &key in &keys[1..4] {
            tt.store(key, 0, Move::NULL, 0, 0, 4, Bound::Exact);
        }

        tt.store(keys[4], 0, Move::NULL, 0, 0, 1, Bound::Exact);

        assert!(tt.probe(keys[0], 0).is_none(), "aged entry should be evicted");
    }

    #[test]
    fn shallow_non_exact_update_is_rejected() {
        let tt = TranspositionTable::new(1);
        let key = 0x1111_2222_3333_4444;
        tt.store(key, 0, mv("e2", "e4"), 0, 100, 8, Bound::Lower);

        tt.store(key, 0, mv("d2", "d4"), 0, -50, 6, Bound::Upper);
        let hit = tt.probe(key, 0).unwrap();
        assert_eq!(hit.mv, mv("e2", "e4"));
        assert_eq!(hit.depth, 8);

        // One ply shallower is still accepted.
        tt.store(key, 0, mv("d2", "d4"), 0, -50, 7, Bound::Upper);
        assert_eq!(tt.probe(key, 0).unwrap().depth, 7);

        // Exact results always overwrite.
        tt.store(key, 0, mv("c2", "c4"), 0, 5, 1, Bound::Exact);
        assert_eq!(tt.probe(key, 0).unwrap().mv, mv("c2", "c4"));
    }

    #[test]
    fn update_without_move_keeps_previous_move() {
        let tt = TranspositionTable::new(1);
        let key = 0x7777_0000_0000_0001;
        tt.store(key, 0, mv("g1", "f3"), 0, 20, 4, Bound::Lower);
        tt.store(key, 0, Move::NULL, 0, 10, 5, Bound::Upper);
        assert_eq!(tt.probe(key, 0).unwrap().mv, mv("g1", "f3"));
    }

    #[test]
    fn clear_removes_all_entries() {
        let tt = TranspositionTable::new(1);
        let key = 0xAAAA_BBBB_CCCC_DDDD;
        tt.store(key, 0, mv("e2", "e4"), 0, 100, 5, Bound::Exact);
        tt.clear();
        assert!(tt.probe(key, 0).is_none());
    }

    #[test]
    fn resize_clears_table() {
        let mut tt = TranspositionTable::new(1);
        let key = 0xAAAA_BBBB_CCCC_DDDD;
        tt.store(key, 0, mv("e2", "e4"), 0, 100, 5, Bound::Exact);
        tt.resize(2);
        assert!(tt.probe(key, 0).is_none());
        assert_eq!(tt.capacity(), 2 * 1024 * 1024 / 16);
    }

    #[test]
    fn torn_entry_reads_as_miss() {
        let tt = TranspositionTable::new(1);
        let key = 0xDEAD_BEEF_1234_5678;
        tt.store(key, 0, mv("e2", "e4"), 0, 100, 5, Bound::Exact);

        let entry = tt
            .cluster(key)
            .entries
            .iter()
            .find(|e| e.word0.load(Ordering::Relaxed) != 0)
            .unwrap();
        let w1 = entry.word1.load(Ordering::Relaxed);
        entry.word1.store(w1 ^ 0xFFFF_FFFF_0000_0000, Ordering::Relaxed);

        assert!(tt.probe(key, 0).is_none());
    }

    #[test]
    fn probe_refreshes_generation() {
        let tt = TranspositionTable::new(1);
        let keys = colliding_keys(&tt, 5);
        tt.store(keys[0], 0, Move::NULL, 0, 0, 6, Bound::Exact);
        for _ in 0..4 {
            tt.new_search();
        }
        for &key in &keys[1..4] {
            tt.store(key, 0, Move::NULL, 0, 0, 3, Bound::Exact);
        }
        // Touching the old entry makes it current again (worth 6 instead of 2).
        assert!(tt.probe(keys[0], 0).is_some());

        tt.store(keys[4], 0, Move::NULL, 0, 0, 1, Bound::Exact);
        assert!(tt.probe(keys[0], 0).is_some());
    }

    #[test]
    fn hashfull_counts_current_generation() {
        let tt = TranspositionTable::new(1);
        assert_eq!(tt.hashfull(), 0);
        for i in 0..250u64 {
            for j in 0..CLUSTER_SIZE as u64 {
                tt.store(((j + 1) << 32) | i, 0, Move::NULL, 0, 0, 1, Bound::Exact);
            }
        }
        assert_eq!(tt.hashfull(), 1000);
        tt.new_search();
        assert_eq!(tt.hashfull(), 0);
    }
}

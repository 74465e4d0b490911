//! Game-tree search for quiver.
//!
//! The crate knows nothing about chess rules. A board implements
//! [`Position`], an evaluation implements [`Evaluator`], and [`Searcher`]
//! runs iterative-deepening principal variation search over them.

pub mod control;
pub mod error;
pub mod history;
pub mod limits;
pub mod ordering;
pub mod position;
pub mod score;
pub mod search;
pub mod thread;
pub mod tt;
pub mod types;

pub use control::SearchControl;
pub use error::EngineError;
pub use history::{HistoryHeuristics, MoveContext};
pub use limits::{SearchLimits, TimeBudget, compute_budget};
pub use ordering::MovePicker;
pub use position::{Evaluator, GenKind, Position};
pub use search::{SearchEvent, SearchReport, SearchResult, Searcher};
pub use thread::SearchThread;
pub use tt::{Bound, TranspositionTable, TtHit};
pub use types::{Color, MAX_MOVES, Move, MoveList, PieceKind, Square};

//! Chess for the quiver search: a [`ChessPosition`] implementing the
//! engine's `Position` contract on top of `shakmaty`, exchange evaluation,
//! and a tapered hand-crafted [`ChessEvaluator`].

pub mod error;
pub mod eval;
pub mod position;
pub mod see;

pub use error::BoardError;
pub use eval::ChessEvaluator;
pub use position::ChessPosition;

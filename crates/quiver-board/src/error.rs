//! Errors from setting up positions and applying game moves.

/// Errors raised while building a [`ChessPosition`](crate::ChessPosition).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The FEN string could not be parsed.
    #[error("invalid FEN \"{fen}\": {reason}")]
    InvalidFen {
        /// The rejected input.
        fen: String,
        /// Parser message.
        reason: String,
    },

    /// The FEN parsed but describes a position that cannot arise in chess.
    #[error("illegal position \"{fen}\": {reason}")]
    IllegalPosition {
        /// The rejected input.
        fen: String,
        /// Validation message.
        reason: String,
    },

    /// A game move was malformed or not legal in the current position.
    #[error("invalid move \"{uci}\"")]
    InvalidMove {
        /// The move as received.
        uci: String,
    },
}

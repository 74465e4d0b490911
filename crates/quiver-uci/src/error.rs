//! UCI protocol errors.

use quiver_board::BoardError;
use quiver_engine::EngineError;

/// Errors raised while reading or acting on protocol input.
///
/// None of these end the session: the engine logs them and carries on.
#[derive(Debug, thiserror::Error)]
pub enum UciError {
    /// `position` without `startpos` or `fen`.
    #[error("malformed position command: expected startpos or fen")]
    MalformedPosition,

    /// The FEN or one of the moves of a `position` command was rejected.
    #[error(transparent)]
    Board(#[from] BoardError),

    /// A parameter was given without its value.
    #[error("missing value for {param}")]
    MissingValue {
        /// The parameter name.
        param: String,
    },

    /// A parameter value could not be parsed.
    #[error("invalid value for {param}: {value}")]
    InvalidValue {
        /// The parameter name.
        param: String,
        /// The rejected value.
        value: String,
    },

    /// `setoption` named an option the engine does not have.
    #[error("unknown option: {name}")]
    UnknownOption {
        /// The option name as received.
        name: String,
    },

    /// The search layer refused a request.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

//! Engine errors.

/// Errors surfaced by the engine's public API.
///
/// A search running out of budget is not an error; it ends normally with
/// the best result of the last completed iteration.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested transposition table size is outside the supported range.
    #[error("invalid hash size: {mb} MB (expected {min}..={max})")]
    InvalidHashSize {
        /// Requested size.
        mb: usize,
        /// Smallest accepted size.
        min: usize,
        /// Largest accepted size.
        max: usize,
    },

    /// No search has been started, so there is no result to wait for.
    #[error("no search to wait for")]
    NoSearch,

    /// The worker thread could not be spawned.
    #[error("failed to spawn search thread: {source}")]
    Spawn {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The worker thread panicked mid-search.
    #[error("search thread panicked")]
    WorkerPanicked,
}

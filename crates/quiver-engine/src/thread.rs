//! The dedicated OS thread a search runs on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::error::EngineError;
use crate::limits::SearchLimits;
use crate::position::{Evaluator, Position};
use crate::search::{SearchEvent, SearchResult, Searcher};

/// Recursion is deep and every frame carries a move picker.
const SEARCH_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Runs one search at a time on its own thread.
///
/// The [`Searcher`] sits behind a mutex that the worker holds for the whole
/// search, so option changes made through [`searcher`](Self::searcher) wait
/// for the running search to finish.
pub struct SearchThread {
    searcher: Arc<Mutex<Searcher>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<SearchResult>>,
}

impl SearchThread {
    /// Wrap a searcher; no thread is started yet.
    pub fn new(searcher: Searcher) -> Self {
        Self {
            searcher: Arc::new(Mutex::new(searcher)),
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Start searching `pos`. A previous search is stopped and joined first.
    ///
    /// `on_event` runs on the search thread.
    pub fn start<P, E, F>(&mut self, pos: P, eval: E, limits: SearchLimits, mut on_event: F) -> Result<(), EngineError>
    where
        P: Position + Clone + Send + 'static,
        E: Evaluator<P> + Send + 'static,
        F: FnMut(SearchEvent) + Send + 'static,
    {
        if self.handle.is_some() {
            self.stop();
            if let Err(e) = self.wait() {
                warn!(error = %e, "previous search ended abnormally");
            }
        }

        self.stop.store(false, Ordering::Relaxed);
        let searcher = Arc::clone(&self.searcher);
        let stop = Arc::clone(&self.stop);

        let handle = thread::Builder::new()
            .name("quiver-search".into())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || {
                let mut searcher = searcher.lock().unwrap_or_else(PoisonError::into_inner);
                searcher.search(&pos, &eval, &limits, stop, &mut on_event)
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Ask the running search to stop. Returns immediately.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Whether a search is still running.
    pub fn is_searching(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Block until the current search ends and return its result.
    pub fn wait(&mut self) -> Result<SearchResult, EngineError> {
        let handle = self.handle.take().ok_or(EngineError::NoSearch)?;
        handle.join().map_err(|_| EngineError::WorkerPanicked)
    }

    /// Exclusive access to the searcher, blocking while a search runs.
    pub fn searcher(&self) -> MutexGuard<'_, Searcher> {
        self.searcher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SearchThread {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
            let _ = self.wait();
        }
    }
}

impl std::fmt::Debug for SearchThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchThread")
            .field("searching", &self.is_searching())
            .finish()
    }
}

//! Severity-driven failure handling and run status accumulation

use crate::error::{ExportError, Severity};
use crate::types::RunStatus;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Applies the continuation policy for classified failures and tallies the run outcome
///
/// One handler lives for the duration of a run and is shared (via `Arc`) by the board
/// orchestrator, the card fetcher, the renderers and the worker pool. Counters are
/// atomics so workers never contend on a lock to report a failure.
#[derive(Debug, Default)]
pub struct ErrorHandler {
    had_errors: AtomicBool,
    error_count: AtomicUsize,
    warning_count: AtomicUsize,
    processed_boards: Mutex<Vec<String>>,
}

impl ErrorHandler {
    /// Create a handler with a clean slate
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a failure at the level its severity demands and update the tallies
    ///
    /// - [`Severity::Warning`]: logged, status untouched
    /// - [`Severity::Error`]: logged and counted
    /// - [`Severity::Critical`]: logged, counted and marks the run as having errors
    pub fn handle(&self, err: &ExportError) {
        match err.severity {
            Severity::Warning => {
                self.warning_count.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    operation = err.operation,
                    context = %err.context,
                    error = %err.source,
                    "failed to {}", err.operation
                );
            }
            Severity::Error => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    operation = err.operation,
                    context = %err.context,
                    error = %err.source,
                    "failed to {}", err.operation
                );
            }
            Severity::Critical => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                self.had_errors.store(true, Ordering::Release);
                tracing::error!(
                    operation = err.operation,
                    context = %err.context,
                    error = %err.source,
                    "CRITICAL: failed to {}", err.operation
                );
            }
        }
    }

    /// Record a board whose export was started, as `"{name} ({id})"`
    pub fn record_board(&self, board_ref: String) {
        self.boards().push(board_ref);
    }

    /// Whether a critical failure has been seen
    pub fn had_errors(&self) -> bool {
        self.had_errors.load(Ordering::Acquire)
    }

    /// Number of error and critical failures seen
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Number of warnings seen
    pub fn warning_count(&self) -> usize {
        self.warning_count.load(Ordering::Relaxed)
    }

    /// Snapshot the accumulated outcome
    pub fn status(&self, cancelled: bool) -> RunStatus {
        RunStatus {
            had_errors: self.had_errors(),
            error_count: self.error_count(),
            processed_boards: self.boards().clone(),
            cancelled,
        }
    }

    fn boards(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.processed_boards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

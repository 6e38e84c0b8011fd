//! Board export pipeline split into focused submodules.
//!
//! The `Exporter` struct and its helpers are organized by stage:
//! - [`board`] - Board-level metadata and card selection
//! - [`list_cache`] - Per-board list prefetch
//! - [`fetcher`] - Comprehensive card fetch with per-field fallback
//! - [`classify`] - Link-card detection and target paths
//! - [`render`] - Per-card file rendering
//! - [`pipeline`] - Worker pool over the cards of a board
//! - [`report`] - Severity handling and run status

pub mod board;
pub mod classify;
pub mod fetcher;
pub mod list_cache;
pub mod pipeline;
pub mod render;
pub mod report;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use board::BoardReport;
pub use pipeline::{CardOutcome, PipelineState, PipelineSummary};
pub use report::ErrorHandler;

use crate::api::{BoardSource, Card, Label, TrelloClient};
use crate::buffer_pool::BufferPool;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{CardCounts, CardFilter, Event, RunStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context string used in failure reports for a card
pub(crate) fn card_context(card: &Card) -> String {
    format!("card {} ({})", card.name, card.id)
}

/// Board exporter (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Exporter {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Remote board source
    pub(crate) source: Arc<dyn BoardSource>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Render buffers shared by every card job of the run
    pub(crate) buffers: BufferPool,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("config", &self.config)
            .field("buffers", &self.buffers)
            .finish_non_exhaustive()
    }
}

impl Exporter {
    /// Create an exporter reading from `source`
    pub fn new(config: Config, source: Arc<dyn BoardSource>) -> Self {
        // Buffer size of 1000 events; slow subscribers see `RecvError::Lagged`
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Self {
            config: Arc::new(config),
            source,
            event_tx,
            buffers: BufferPool::new(),
        }
    }

    /// Create an exporter talking to the board API described by `config.api`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the configuration fails [`Config::validate`] or the
    /// HTTP client cannot be built.
    pub fn connect(config: Config) -> Result<Self> {
        config.validate()?;
        let client = TrelloClient::new(&config.api, config.retry.clone())?;
        Ok(Self::new(config, Arc::new(client)))
    }

    /// Subscribe to export events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events
    /// independently.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the configuration the exporter runs with
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// Dropped silently when nobody listens.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Export every configured board
    pub async fn run(&self) -> Result<RunStatus> {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Export every configured board until `cancel` fires
    ///
    /// Boards are exported one after another. A board-level failure ends that board and
    /// the run continues with the next ID. Cancellation stops dispatching new cards,
    /// lets in-flight cards finish and skips the remaining boards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unusable export configuration and [`Error::Io`]
    /// when the storage root cannot be created. Everything else is reported through the
    /// log stream and summarized in the returned [`RunStatus`].
    pub async fn run_with_cancel(&self, cancel: CancellationToken) -> Result<RunStatus> {
        self.config.validate_export()?;
        let board_ids: Vec<&str> = self
            .config
            .board_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if board_ids.is_empty() {
            return Err(Error::config("board_ids", "no board IDs provided"));
        }

        let root = self.config.storage_dir();
        tokio::fs::create_dir_all(root).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create storage directory '{}': {}", root.display(), e),
            ))
        })?;

        let handler = Arc::new(ErrorHandler::new());
        let mut cancelled = false;

        for board_id in board_ids {
            if cancel.is_cancelled() {
                tracing::warn!(board_id, "export cancelled, skipping remaining boards");
                cancelled = true;
                break;
            }

            self.emit_event(Event::BoardStarted {
                board_id: board_id.to_string(),
            });
            match self.export_board(board_id, &handler, &cancel).await {
                Ok(report) => {
                    tracing::info!(
                        board_id,
                        name = %report.board.name,
                        exported = report.summary.exported,
                        link_cards = report.summary.link_cards,
                        failed = report.summary.failed,
                        skipped = report.summary.skipped,
                        "board export finished"
                    );
                    self.emit_event(Event::BoardExported {
                        board_id: report.board.id,
                        name: report.board.name,
                        cards: report.summary.total,
                        failed: report.summary.failed,
                    });
                }
                Err(err) if err.is_cancelled() => {
                    tracing::warn!(board_id, "export cancelled before cards were dispatched");
                    cancelled = true;
                    break;
                }
                Err(err) => {
                    handler.handle(&err);
                    self.emit_event(Event::BoardFailed {
                        board_id: board_id.to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }
        cancelled |= cancel.is_cancelled();

        let status = handler.status(cancelled);
        if status.had_errors {
            tracing::warn!(
                boards = ?status.processed_boards,
                errors = status.error_count,
                cancelled,
                "export finished with errors, check the log for details"
            );
        } else {
            tracing::info!(
                boards = ?status.processed_boards,
                errors = status.error_count,
                cancelled,
                "export finished"
            );
        }
        Ok(status)
    }

    /// Count the open and archived cards of a board
    pub async fn count_cards(&self, board_id: &str) -> Result<CardCounts> {
        let cards = self.source.fetch_cards(board_id, CardFilter::All).await?;
        let archived = cards.iter().filter(|c| c.closed).count();

        Ok(CardCounts {
            open: cards.len() - archived,
            archived,
            total: cards.len(),
        })
    }

    /// Label definitions of a board
    ///
    /// Render them with [`render::render_labels_table`].
    pub async fn board_labels(&self, board_id: &str) -> Result<Vec<Label>> {
        self.source.fetch_board_labels(board_id).await
    }
}

//! Board-level export: metadata first, then the card pipeline

use super::Exporter;
use super::fetcher::CardFetcher;
use super::list_cache::ListCache;
use super::pipeline::{CardPipeline, JobContext, PipelineSummary};
use super::render::{self, CardRenderer, render_labels_table, render_members};
use super::report::ErrorHandler;
use crate::api::{Board, Card};
use crate::error::{Error, ExportError};
use crate::types::CardFilter;
use crate::utils::{file_name_from_url, sanitize_path_name};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Board label table file name
pub const BOARD_LABELS_FILE: &str = "BoardLabels.md";
/// Board members file name
pub const BOARD_MEMBERS_FILE: &str = "BoardMembers.md";
/// Prefix of the downloaded board background image
pub const BOARD_BACKGROUND_PREFIX: &str = "BoardBackground-";

/// Result of exporting one board
#[derive(Clone, Debug)]
pub struct BoardReport {
    /// The board as fetched
    pub board: Board,
    /// Board directory
    pub dir: PathBuf,
    /// Card pipeline totals
    pub summary: PipelineSummary,
}

fn board_context(board: &Board) -> String {
    format!("board {}", board.display_ref())
}

impl Exporter {
    /// Export one board
    ///
    /// Any returned error is critical for this board only: the caller moves on to the
    /// next board ID. Non-fatal failures (background, label or member fetches) are
    /// passed to `handler` and the export continues. A cancellation noticed after the
    /// metadata files returns an error carrying [`Error::Cancelled`] before any card is
    /// fetched.
    pub(crate) async fn export_board(
        &self,
        board_id: &str,
        handler: &Arc<ErrorHandler>,
        cancel: &CancellationToken,
    ) -> Result<BoardReport, ExportError> {
        let board = self
            .source
            .fetch_board(board_id)
            .await
            .map_err(|e| ExportError::critical("get board", format!("board {board_id}"), e))?;

        let dir = self.config.storage_dir().join(sanitize_path_name(&board.name));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ExportError::critical("create board directory", board_context(&board), e))?;
        handler.record_board(board.display_ref());
        tracing::info!(board_id = %board.id, name = %board.name, path = %dir.display(), "exporting board");

        self.save_background(&board, &dir, handler).await;
        self.save_labels(&board, &dir, handler).await?;
        self.save_members(&board, &dir, handler).await?;

        if cancel.is_cancelled() {
            return Err(ExportError::warning(
                "export board cards",
                board_context(&board),
                Error::Cancelled,
            ));
        }

        let cards = self.board_cards(&board).await?;
        if cards.is_empty() {
            return Err(ExportError::critical(
                "find cards",
                board_context(&board),
                Error::NotFound(format!("no cards found for board {}", board.name)),
            ));
        }
        tracing::info!(board_id = %board.id, cards = cards.len(), "found cards to process");

        let lists = ListCache::build(self.source.as_ref(), &board, handler).await;
        let fetcher = CardFetcher::new(Arc::clone(&self.source), Arc::clone(handler));
        let renderer = CardRenderer::new(
            Arc::clone(&self.source),
            fetcher.clone(),
            self.buffers.clone(),
            Arc::clone(handler),
        );
        let ctx = Arc::new(JobContext {
            board_id: board.id.clone(),
            board_dir: dir.clone(),
            split_archived: self.config.export.split_archived,
            lists: Arc::new(lists),
            source: Arc::clone(&self.source),
            fetcher,
            renderer,
            handler: Arc::clone(handler),
        });

        let mut pipeline = CardPipeline::new(
            self.config.export.concurrency,
            self.event_tx.clone(),
            cancel.clone(),
        );
        let summary = pipeline.run(ctx, cards).await;

        Ok(BoardReport {
            board,
            dir,
            summary,
        })
    }

    /// Download the background image, if the board has one
    async fn save_background(&self, board: &Board, dir: &Path, handler: &ErrorHandler) {
        let Some(url) = board
            .prefs
            .background_image
            .as_deref()
            .filter(|u| !u.is_empty())
        else {
            tracing::info!(board_id = %board.id, "no background image");
            return;
        };

        let bytes = match self.source.download_file(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                handler.handle(&ExportError::error(
                    "download board background",
                    board_context(board),
                    e,
                ));
                return;
            }
        };

        let file_name = format!(
            "{BOARD_BACKGROUND_PREFIX}{}",
            sanitize_path_name(&file_name_from_url(url))
        );
        let path = dir.join(file_name);
        match render::write_file(&path, &bytes).await {
            Ok(()) => tracing::debug!(path = %path.display(), "saved board background"),
            Err(e) => handler.handle(&ExportError::error(
                "write board background",
                board_context(board),
                e,
            )),
        }
    }

    /// Write `BoardLabels.md`; only a write failure ends the board
    async fn save_labels(
        &self,
        board: &Board,
        dir: &Path,
        handler: &ErrorHandler,
    ) -> Result<(), ExportError> {
        match self.source.fetch_board_labels(&board.id).await {
            Ok(labels) => {
                self.write_board_file(board, &dir.join(BOARD_LABELS_FILE), "write board labels", |out| {
                    render_labels_table(out, &labels)
                })
                .await
            }
            Err(e) => {
                handler.handle(&ExportError::error("get board labels", board_context(board), e));
                Ok(())
            }
        }
    }

    /// Write `BoardMembers.md`; only a write failure ends the board
    async fn save_members(
        &self,
        board: &Board,
        dir: &Path,
        handler: &ErrorHandler,
    ) -> Result<(), ExportError> {
        match self.source.fetch_board_members(&board.id).await {
            Ok(members) => {
                self.write_board_file(board, &dir.join(BOARD_MEMBERS_FILE), "write board members", |out| {
                    render_members(out, &members)
                })
                .await
            }
            Err(e) => {
                handler.handle(&ExportError::error("get board members", board_context(board), e));
                Ok(())
            }
        }
    }

    async fn write_board_file<F>(
        &self,
        board: &Board,
        path: &Path,
        operation: &'static str,
        fill: F,
    ) -> Result<(), ExportError>
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = self.buffers.acquire();
        fill(&mut *buf).map_err(|e| ExportError::critical(operation, board_context(board), e))?;
        render::write_file(path, buf.as_slice())
            .await
            .map_err(|e| ExportError::critical(operation, board_context(board), e))?;
        tracing::debug!(path = %path.display(), "wrote board file");
        Ok(())
    }

    /// Cards selected by the label filter or the archived-inclusion setting
    async fn board_cards(&self, board: &Board) -> Result<Vec<Card>, ExportError> {
        match self.config.export.label_filter.as_deref() {
            Some(label) => {
                tracing::info!(board_id = %board.id, label, "searching cards by label name");
                self.source
                    .search_cards_by_label(&board.id, label)
                    .await
                    .map_err(|e| {
                        ExportError::critical(
                            "search cards by label",
                            format!("{}, label {label}", board_context(board)),
                            e,
                        )
                    })
            }
            None => {
                let filter = CardFilter::from_include_archived(self.config.export.include_archived);
                self.source
                    .fetch_cards(&board.id, filter)
                    .await
                    .map_err(|e| ExportError::critical("get board cards", board_context(board), e))
            }
        }
    }
}

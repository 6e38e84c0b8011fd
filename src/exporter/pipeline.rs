//! Bounded-concurrency card pipeline
//!
//! A dispatcher task feeds one job per card into an mpsc queue sized to the card count.
//! A fixed set of worker tasks share the receiving end behind a mutex, process one card
//! at a time and push exactly one result per job. A waiter task joins the workers and
//! then closes the result channel, which ends the drain loop in [`CardPipeline::run`].

use super::card_context;
use super::classify::{CardKind, card_dir, card_dir_names, classify, link_card_file};
use super::fetcher::CardFetcher;
use super::list_cache::ListCache;
use super::render::CardRenderer;
use super::report::ErrorHandler;
use crate::api::{BoardSource, Card};
use crate::error::ExportError;
use crate::types::Event;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Lifecycle of one pipeline run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Constructed, not started
    Idle,
    /// Workers spawned, jobs being enqueued
    Dispatching,
    /// Collecting results until every worker finished
    Draining,
    /// All results collected
    Done,
}

/// Everything a job needs besides its card, shared by all workers of a board
pub struct JobContext {
    /// Board ID, for events
    pub board_id: String,
    /// Sanitized board directory under the storage root
    pub board_dir: PathBuf,
    /// Place archived cards under `ARCHIVED/` instead of suffixing them
    pub split_archived: bool,
    /// Read-only list cache built before the pool starts
    pub lists: Arc<ListCache>,
    /// Remote source
    pub source: Arc<dyn BoardSource>,
    /// Comprehensive fetcher
    pub fetcher: CardFetcher,
    /// Per-card renderer
    pub renderer: CardRenderer,
    /// Failure handler for the run
    pub handler: Arc<ErrorHandler>,
}

/// What a successful job produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardOutcome {
    /// Regular card written into this directory
    Exported {
        /// Card directory
        path: PathBuf,
    },
    /// Link card written as this pointer file
    LinkCard {
        /// Pointer file
        path: PathBuf,
    },
    /// Job dequeued after cancellation; nothing was written
    Skipped,
}

/// One card plus the directory segment assigned to it before dispatch
struct CardJob {
    card: Card,
    dir_name: String,
}

struct JobResult {
    card_id: String,
    outcome: Result<CardOutcome, ExportError>,
}

/// Totals of one pipeline run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    /// Cards handed to the pipeline
    pub total: usize,
    /// Regular cards written
    pub exported: usize,
    /// Link cards written
    pub link_cards: usize,
    /// Jobs that returned an error
    pub failed: usize,
    /// Jobs skipped because the run was cancelled
    pub skipped: usize,
    /// Jobs that reached a worker, whatever the outcome
    pub completed: usize,
}

/// Worker pool for the cards of one board
pub struct CardPipeline {
    concurrency: usize,
    state: PipelineState,
    event_tx: broadcast::Sender<Event>,
    cancel: CancellationToken,
}

impl CardPipeline {
    /// Create a pipeline with `concurrency` workers (at least one)
    pub fn new(
        concurrency: usize,
        event_tx: broadcast::Sender<Event>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            concurrency: concurrency.max(1),
            state: PipelineState::Idle,
            event_tx,
            cancel,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(from = ?self.state, to = ?next, "pipeline state change");
        self.state = next;
    }

    /// Process every card and collect one result per dispatched job
    ///
    /// Card failures are passed to the context's handler and never stop the run.
    pub async fn run(&mut self, ctx: Arc<JobContext>, cards: Vec<Card>) -> PipelineSummary {
        let total = cards.len();
        let mut summary = PipelineSummary {
            total,
            ..Default::default()
        };
        if total == 0 {
            self.transition(PipelineState::Done);
            return summary;
        }

        self.transition(PipelineState::Dispatching);
        // Targets are fixed up front so no two workers ever share a card directory
        let jobs: Vec<CardJob> = card_dir_names(&cards)
            .into_iter()
            .zip(cards)
            .map(|(dir_name, card)| CardJob { card, dir_name })
            .collect();
        let (job_tx, job_rx) = mpsc::channel::<CardJob>(total);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<JobResult>(total);
        let completed = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..self.concurrency)
            .map(|worker_id| {
                let job_rx = Arc::clone(&job_rx);
                let result_tx = result_tx.clone();
                let ctx = Arc::clone(&ctx);
                let completed = Arc::clone(&completed);
                let cancel = self.cancel.clone();
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    loop {
                        let next = job_rx.lock().await.recv().await;
                        let Some(job) = next else { break };

                        let outcome = if cancel.is_cancelled() {
                            tracing::debug!(card_id = %job.card.id, "skipping card after cancellation");
                            Ok(CardOutcome::Skipped)
                        } else {
                            process_card(&ctx, &job).await
                        };

                        let processed = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        event_tx
                            .send(Event::Progress {
                                board_id: ctx.board_id.clone(),
                                processed,
                                total,
                            })
                            .ok();

                        let result = JobResult {
                            card_id: job.card.id,
                            outcome,
                        };
                        if result_tx.send(result).await.is_err() {
                            break;
                        }
                    }
                    tracing::trace!(worker_id, "card worker finished");
                })
            })
            .collect();

        // Waiter: the result channel closes once every worker is gone
        tokio::spawn(async move {
            for joined in futures::future::join_all(workers).await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "card worker panicked");
                }
            }
            drop(result_tx);
        });

        // Dispatcher: dropping job_tx closes the queue
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            for job in jobs {
                if cancel.is_cancelled() {
                    tracing::info!("export cancelled, no further cards dispatched");
                    break;
                }
                if job_tx.send(job).await.is_err() {
                    break;
                }
            }
        });

        self.transition(PipelineState::Draining);
        while let Some(result) = result_rx.recv().await {
            match result.outcome {
                Ok(CardOutcome::Exported { path }) => {
                    summary.exported += 1;
                    self.emit_exported(result.card_id, path);
                }
                Ok(CardOutcome::LinkCard { path }) => {
                    summary.link_cards += 1;
                    self.emit_exported(result.card_id, path);
                }
                Ok(CardOutcome::Skipped) => summary.skipped += 1,
                Err(err) => {
                    summary.failed += 1;
                    ctx.handler.handle(&err);
                    self.event_tx
                        .send(Event::CardFailed {
                            card_id: result.card_id,
                            error: err.to_string(),
                        })
                        .ok();
                }
            }
        }
        summary.completed = completed.load(Ordering::SeqCst);

        if summary.failed > 0 {
            tracing::warn!(
                board_id = %ctx.board_id,
                failed = summary.failed,
                total,
                "completed with {} errors out of {} cards",
                summary.failed,
                total
            );
        }
        self.transition(PipelineState::Done);
        summary
    }

    fn emit_exported(&self, card_id: String, path: PathBuf) {
        self.event_tx
            .send(Event::CardExported { card_id, path })
            .ok();
    }
}

/// One job: list lookup, classification, directory creation, rendering
async fn process_card(ctx: &JobContext, job: &CardJob) -> Result<CardOutcome, ExportError> {
    let card = &job.card;
    let list = ctx
        .lists
        .resolve(ctx.source.as_ref(), &card.id_list)
        .await
        .map_err(|e| ExportError::critical("get list", card_context(card), e))?;

    match classify(ctx.source.as_ref(), card, &ctx.handler).await {
        CardKind::Link => {
            let file = link_card_file(&ctx.board_dir, &list.name, &card.name);
            ctx.renderer.render_link(card, &file).await?;
            Ok(CardOutcome::LinkCard { path: file })
        }
        CardKind::Regular => {
            let dir = card_dir(
                &ctx.board_dir,
                &list.name,
                card,
                &job.dir_name,
                ctx.split_archived,
            );
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                ExportError::critical("create card directory", card_context(card), e)
            })?;

            let full = ctx.fetcher.comprehensive(card).await;
            ctx.renderer.render(&full, &dir).await?;
            Ok(CardOutcome::Exported { path: dir })
        }
    }
}

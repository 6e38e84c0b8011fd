//! # trello-dump
//!
//! Concurrent exporter that archives Trello boards into a local directory tree of
//! Markdown and binary files.
//!
//! ## Design Philosophy
//!
//! trello-dump is designed to be:
//! - **Library-first** - No CLI, purely a Rust crate for embedding
//! - **Failure-tolerant** - Every failure is classified by severity; one bad card never
//!   stops a board, one bad board never stops a run
//! - **Truthful output** - An empty file means "checked, found nothing", a missing file
//!   means "could not be retrieved"
//! - **Event-driven** - Consumers subscribe to progress events, no polling required
//!
//! ## Output layout
//!
//! ```text
//! {storage_dir}/{board}/BoardLabels.md
//! {storage_dir}/{board}/BoardMembers.md
//! {storage_dir}/{board}/BoardBackground-{file}
//! {storage_dir}/{board}/{list}/{card}/CardDescription.md, attachments/, checklists/, ...
//! {storage_dir}/{board}/{list}/{card} (ARCHIVED)/...          archived, default
//! {storage_dir}/{board}/ARCHIVED/{list}/{card}/...            archived, split mode
//! {storage_dir}/{board}/{list}/Link Cards Only/CARD - {url}.md
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use trello_dump::config::{ApiCredentials, Config, ExportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (credentials, _) = ApiCredentials::from_env()?;
//!     let mut config = Config {
//!         board_ids: vec!["5f1b2c3d4e5f6a7b8c9d0e1f".to_string()],
//!         export: ExportConfig {
//!             storage_dir: "backup".into(),
//!             include_archived: true,
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     };
//!     config.api.credentials = credentials;
//!
//!     let status = trello_dump::run(config).await?;
//!     if status.had_errors {
//!         eprintln!("export finished with {} errors", status.error_count);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Remote board API: source trait, HTTP client and payload models
pub mod api;
/// Reusable render buffers
pub mod buffer_pool;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export pipeline (decomposed into focused submodules)
pub mod exporter;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use api::{BoardSource, TrelloClient};
pub use config::{ApiConfig, ApiCredentials, Config, ExportConfig, RetryConfig};
pub use error::{Error, ExportError, Result, Severity};
pub use exporter::{ErrorHandler, Exporter, PipelineSummary};
pub use types::{ActionFilter, CardCounts, CardFilter, Event, RunStatus};

use tokio_util::sync::CancellationToken;

/// Export every board in `config.board_ids` over the HTTP API
///
/// # Errors
///
/// Fails on an invalid configuration or an uncreatable storage root. Board and card
/// failures are logged and reflected in the returned [`RunStatus`].
pub async fn run(config: Config) -> Result<RunStatus> {
    Exporter::connect(config)?.run().await
}

/// Helper function to run an export with graceful signal handling.
///
/// On a termination signal no further cards are dispatched, cards in flight are
/// finished and the remaining boards are skipped. The returned status then has
/// `cancelled` set.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use trello_dump::{Config, Exporter, run_until_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let exporter = Exporter::connect(Config::default())?;
///     let mut events = exporter.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("Event: {:?}", event);
///         }
///     });
///
///     let status = run_until_signal(&exporter).await?;
///     println!("cancelled: {}", status.cancelled);
///     Ok(())
/// }
/// ```
pub async fn run_until_signal(exporter: &Exporter) -> Result<RunStatus> {
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let signal_task = tokio::spawn(async move {
        wait_for_signal().await;
        tracing::warn!("shutdown requested, finishing cards in flight");
        trigger.cancel();
    });

    let result = exporter.run_with_cancel(cancel).await;
    signal_task.abort();
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

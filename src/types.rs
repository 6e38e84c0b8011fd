//! Core types and events for trello-dump

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which cards of a board to fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardFilter {
    /// Only open cards
    Open,
    /// Open and archived (closed) cards
    All,
}

impl CardFilter {
    /// Query-string value understood by the board API
    pub fn as_str(&self) -> &'static str {
        match self {
            CardFilter::Open => "open",
            CardFilter::All => "all",
        }
    }

    /// Filter implied by the archived-inclusion setting
    pub fn from_include_archived(include_archived: bool) -> Self {
        if include_archived {
            CardFilter::All
        } else {
            CardFilter::Open
        }
    }
}

/// Which actions of a card to fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionFilter {
    /// Comment actions only (`commentCard`)
    Comments,
    /// The full activity history
    All,
}

impl ActionFilter {
    /// Query-string value understood by the board API
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionFilter::Comments => COMMENT_ACTION_TYPE,
            ActionFilter::All => "all",
        }
    }
}

/// Action type used by the API for card comments
pub const COMMENT_ACTION_TYPE: &str = "commentCard";

/// Card totals for a board
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardCounts {
    /// Cards that are not archived
    pub open: usize,
    /// Archived (closed) cards
    pub archived: usize,
    /// All cards
    pub total: usize,
}

/// Outcome of an export run
///
/// Returned from [`crate::Exporter::run`]. Individual failures are only visible in the
/// log stream; this summary says whether any occurred and which boards were touched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    /// At least one critical failure (or failed card) occurred
    pub had_errors: bool,
    /// Number of error and critical failures seen during the run
    pub error_count: usize,
    /// Boards whose export was started, as `"{name} ({id})"`
    pub processed_boards: Vec<String>,
    /// The run was cancelled before every board finished
    pub cancelled: bool,
}

/// Export events broadcast to subscribers
///
/// Subscribe via [`crate::Exporter::subscribe`]. Events are informational; the run
/// outcome is carried by [`RunStatus`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Board export started
    BoardStarted {
        /// Board ID as requested
        board_id: String,
    },

    /// Board export finished (possibly with card failures)
    BoardExported {
        /// Board ID
        board_id: String,
        /// Board display name
        name: String,
        /// Number of cards handed to the worker pool
        cards: usize,
        /// Number of cards whose job failed
        failed: usize,
    },

    /// Board export aborted by a board-level failure
    BoardFailed {
        /// Board ID
        board_id: String,
        /// Error message
        error: String,
    },

    /// A card was written to disk
    CardExported {
        /// Card ID
        card_id: String,
        /// Directory (regular card) or file (link card) that was written
        path: PathBuf,
    },

    /// A card job failed
    CardFailed {
        /// Card ID
        card_id: String,
        /// Error message
        error: String,
    },

    /// Card progress for the board currently being exported
    Progress {
        /// Board ID
        board_id: String,
        /// Jobs completed so far (success or failure)
        processed: usize,
        /// Total jobs for this board
        total: usize,
    },
}

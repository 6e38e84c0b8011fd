//! Per-board list cache
//!
//! Every card needs its list name to compute its directory. Fetching the list per card
//! would cost one round trip per card, so all lists are loaded once before the worker
//! pool starts and shared read-only between workers.

use super::report::ErrorHandler;
use crate::api::{Board, BoardSource, List};
use crate::error::{ExportError, Result};
use std::borrow::Cow;
use std::collections::HashMap;

/// Lists of one board keyed by list ID
#[derive(Debug, Default)]
pub struct ListCache {
    lists: HashMap<String, List>,
}

impl ListCache {
    /// Fetch every list of `board` in one call
    ///
    /// A failed fetch is not fatal: it is reported with [`crate::Severity::Error`] and an
    /// empty cache is returned, so each card falls back to fetching its own list.
    pub async fn build(source: &dyn BoardSource, board: &Board, handler: &ErrorHandler) -> Self {
        match source.fetch_lists(&board.id).await {
            Ok(lists) => {
                let cache = Self::from_lists(lists);
                tracing::info!(
                    board_id = %board.id,
                    lists = cache.len(),
                    "cached board lists"
                );
                cache
            }
            Err(e) => {
                handler.handle(&ExportError::error(
                    "cache board lists",
                    format!("board {}", board.name),
                    e,
                ));
                Self::default()
            }
        }
    }

    /// Build a cache from already fetched lists
    pub fn from_lists(lists: impl IntoIterator<Item = List>) -> Self {
        Self {
            lists: lists
                .into_iter()
                .map(|list| (list.id.clone(), list))
                .collect(),
        }
    }

    /// Cached list by ID
    pub fn get(&self, list_id: &str) -> Option<&List> {
        self.lists.get(list_id)
    }

    /// Resolve a list, fetching it remotely on a cache miss
    pub async fn resolve<'a>(
        &'a self,
        source: &dyn BoardSource,
        list_id: &str,
    ) -> Result<Cow<'a, List>> {
        if let Some(list) = self.lists.get(list_id) {
            return Ok(Cow::Borrowed(list));
        }
        tracing::debug!(list_id, "list cache miss, fetching list");
        source.fetch_list(list_id).await.map(Cow::Owned)
    }

    /// Number of cached lists
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Whether the cache holds no lists
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

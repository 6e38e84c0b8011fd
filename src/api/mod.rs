//! Remote board API access
//!
//! The export pipeline never talks HTTP directly. It consumes a [`BoardSource`], which
//! [`TrelloClient`] implements over reqwest. Tests substitute an in-memory source.

use crate::error::Result;
use crate::types::{ActionFilter, CardFilter};
use async_trait::async_trait;

pub mod client;
pub mod models;

pub use client::TrelloClient;
pub use models::{
    Action, ActionData, Attachment, Board, BoardPrefs, Card, CheckItem, Checklist, Cover,
    CoverKind, Label, List, Member,
};

/// Card role marker the API uses for link cards
pub const LINK_CARD_ROLE: &str = "link";

/// Read access to boards, lists and cards
///
/// Every method maps a missing resource to [`crate::Error::NotFound`] and any other
/// non-success answer to [`crate::Error::Api`].
#[async_trait]
pub trait BoardSource: Send + Sync {
    /// Fetch a board by ID
    async fn fetch_board(&self, board_id: &str) -> Result<Board>;

    /// Fetch every list of a board
    async fn fetch_lists(&self, board_id: &str) -> Result<Vec<List>>;

    /// Fetch a single list by ID
    async fn fetch_list(&self, list_id: &str) -> Result<List>;

    /// Fetch the label definitions of a board
    async fn fetch_board_labels(&self, board_id: &str) -> Result<Vec<Label>>;

    /// Fetch the members of a board
    async fn fetch_board_members(&self, board_id: &str) -> Result<Vec<Member>>;

    /// Fetch the lightweight cards of a board
    async fn fetch_cards(&self, board_id: &str, filter: CardFilter) -> Result<Vec<Card>>;

    /// Search the open cards of a board carrying a label with the given name
    async fn search_cards_by_label(&self, board_id: &str, label_name: &str)
    -> Result<Vec<Card>>;

    /// Read a card's role marker (`Some("link")` for link cards)
    async fn fetch_card_role(&self, card_id: &str) -> Result<Option<String>>;

    /// Fetch a card with attachments, actions, members, labels and checklists inlined
    async fn fetch_card_comprehensive(&self, card_id: &str) -> Result<Card>;

    /// Fetch a card's attachments
    async fn fetch_attachments(&self, card_id: &str) -> Result<Vec<Attachment>>;

    /// Fetch a checklist with all of its items
    async fn fetch_checklist(&self, checklist_id: &str) -> Result<Checklist>;

    /// Fetch a card's actions
    async fn fetch_actions(&self, card_id: &str, filter: ActionFilter) -> Result<Vec<Action>>;

    /// Fetch a card's members
    async fn fetch_card_members(&self, card_id: &str) -> Result<Vec<Member>>;

    /// Fetch a card's labels
    async fn fetch_card_labels(&self, card_id: &str) -> Result<Vec<Label>>;

    /// Download an arbitrary URL without credentials (board backgrounds)
    async fn download_file(&self, url: &str) -> Result<Vec<u8>>;

    /// Download an uploaded attachment through the authenticated download endpoint
    async fn download_attachment(
        &self,
        card_id: &str,
        attachment_id: &str,
        file_name: &str,
    ) -> Result<Vec<u8>>;
}

//! Board, list and card payloads as returned by the board API.
//!
//! Optional collections on [`Card`] stay `None` when the payload did not carry them.
//! That absence is what the card fetcher checks before falling back to a targeted call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A board (top-level container)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Board ID
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Board preferences (background image, etc.)
    #[serde(default)]
    pub prefs: BoardPrefs,
}

impl Board {
    /// Human-readable reference used in summaries: `"{name} ({id})"`
    pub fn display_ref(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

/// Board preferences relevant to the export
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPrefs {
    /// URL of the background image, if the board uses one
    #[serde(default)]
    pub background_image: Option<String>,
}

/// A list (column) within a board
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    /// List ID
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Owning board
    #[serde(default)]
    pub id_board: String,
    /// Whether the list itself is archived
    #[serde(default)]
    pub closed: bool,
}

/// A member of a board or card
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member ID
    #[serde(default)]
    pub id: String,
    /// Full display name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Login name
    #[serde(default)]
    pub username: Option<String>,
}

/// A label definition
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Label ID
    pub id: String,
    /// Label name (may be empty for color-only labels)
    #[serde(default)]
    pub name: String,
    /// Color name (may be absent for colorless labels)
    #[serde(default)]
    pub color: Option<String>,
}

/// A file or link attached to a card
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Attachment ID
    pub id: String,
    /// Display / file name
    #[serde(default)]
    pub name: String,
    /// Download URL (uploads) or the linked URL (external attachments)
    #[serde(default)]
    pub url: String,
    /// `true` for uploaded files, `false` for plain URL attachments
    #[serde(default)]
    pub is_upload: bool,
}

/// A checklist item
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckItem {
    /// Item ID
    #[serde(default)]
    pub id: String,
    /// Item text
    #[serde(default)]
    pub name: String,
    /// `"complete"` or `"incomplete"`
    #[serde(default)]
    pub state: String,
}

impl CheckItem {
    /// Whether the item is checked off
    pub fn is_complete(&self) -> bool {
        self.state == "complete"
    }
}

/// A checklist on a card
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    /// Checklist ID
    pub id: String,
    /// Checklist name (not unique within a card)
    #[serde(default)]
    pub name: String,
    /// Items in display order
    #[serde(default)]
    pub check_items: Vec<CheckItem>,
}

/// Payload attached to an action
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    /// Comment text (comments) or free text carried by the action
    #[serde(default)]
    pub text: Option<String>,
}

/// An entry of a card's activity history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Action ID
    #[serde(default)]
    pub id: String,
    /// Action type (`commentCard`, `updateCard`, ...)
    #[serde(rename = "type", default)]
    pub action_type: String,
    /// When the action happened
    pub date: DateTime<Utc>,
    /// Who performed it
    #[serde(default)]
    pub member_creator: Option<Member>,
    /// Action payload
    #[serde(default)]
    pub data: ActionData,
}

impl Action {
    /// Whether this action is a comment
    pub fn is_comment(&self) -> bool {
        self.action_type == crate::types::COMMENT_ACTION_TYPE
    }
}

/// Card cover descriptor as delivered by the API
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cover {
    /// Solid color name
    #[serde(default)]
    pub color: Option<String>,
    /// Attachment used as cover image
    #[serde(default)]
    pub id_attachment: Option<String>,
}

/// Resolved cover: a color, an image, or nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoverKind<'a> {
    /// No cover set
    None,
    /// Solid color cover
    Color(&'a str),
    /// Cover image backed by the given attachment ID
    Image(&'a str),
}

/// A card
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Card ID
    pub id: String,
    /// Display name (the URL itself for link cards)
    #[serde(default)]
    pub name: String,
    /// Description text
    #[serde(default)]
    pub desc: String,
    /// Archived flag
    #[serde(default)]
    pub closed: bool,
    /// Owning list
    #[serde(default)]
    pub id_list: String,
    /// Checklist IDs (always present, even on lightweight payloads)
    #[serde(default)]
    pub id_checklists: Vec<String>,
    /// Due timestamp
    #[serde(default)]
    pub due: Option<DateTime<Utc>>,
    /// Whether the due date was marked complete
    #[serde(default)]
    pub due_complete: bool,
    /// Start timestamp
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    /// Cover descriptor
    #[serde(default)]
    pub cover: Option<Cover>,
    /// Attachments (present on comprehensive payloads)
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    /// Full action history (present on comprehensive payloads)
    #[serde(default)]
    pub actions: Option<Vec<Action>>,
    /// Members (present on comprehensive payloads)
    #[serde(default)]
    pub members: Option<Vec<Member>>,
    /// Labels
    #[serde(default)]
    pub labels: Option<Vec<Label>>,
    /// Checklists with items (present on comprehensive payloads)
    #[serde(default)]
    pub checklists: Option<Vec<Checklist>>,
}

impl Card {
    /// Resolve the cover descriptor; a color wins over an image when both are set
    pub fn cover_kind(&self) -> CoverKind<'_> {
        let Some(cover) = &self.cover else {
            return CoverKind::None;
        };
        if let Some(color) = cover.color.as_deref().filter(|c| !c.is_empty()) {
            return CoverKind::Color(color);
        }
        match cover.id_attachment.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => CoverKind::Image(id),
            None => CoverKind::None,
        }
    }

    /// Whether the given attachment is this card's cover image
    pub fn is_cover_attachment(&self, attachment_id: &str) -> bool {
        matches!(self.cover_kind(), CoverKind::Image(id) if id == attachment_id)
    }
}

/// Minimal payload used to read a card's role marker
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CardRole {
    #[serde(default)]
    pub(crate) card_role: Option<String>,
}

/// Search response wrapper
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub(crate) cards: Vec<Card>,
}

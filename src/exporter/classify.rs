//! Link-card detection and card target paths

use super::card_context;
use super::report::ErrorHandler;
use crate::api::{BoardSource, Card, LINK_CARD_ROLE};
use crate::error::ExportError;
use crate::utils::{UniqueNames, sanitize_path_name};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory under a list that collects link-card pointer files
pub const LINK_CARDS_DIR: &str = "Link Cards Only";

/// Board-level directory for archived cards in split mode
pub const ARCHIVED_DIR: &str = "ARCHIVED";

/// Suffix appended to archived card directories when split mode is off
pub const ARCHIVED_SUFFIX: &str = " (ARCHIVED)";

/// How a card is exported
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardKind {
    /// A pure pointer to an external URL; exported as one Markdown file
    Link,
    /// Exported as a directory with all sub-resources
    Regular,
}

/// Classify a card by its remote role marker
///
/// The lightweight card payload lacks the marker, so this issues one targeted request.
/// If that request fails the card is treated as regular and a warning is reported.
pub async fn classify(source: &dyn BoardSource, card: &Card, handler: &ErrorHandler) -> CardKind {
    match source.fetch_card_role(&card.id).await {
        Ok(Some(role)) if role == LINK_CARD_ROLE => CardKind::Link,
        Ok(_) => CardKind::Regular,
        Err(e) => {
            handler.handle(&ExportError::warning(
                "get card role",
                card_context(card),
                e,
            ));
            CardKind::Regular
        }
    }
}

/// Directory segment of every card, in card order
///
/// Cards of one list with the same archived state and sanitized name would share a
/// directory. Repeats are numbered per list (`Paint`, `Paint 1`), so every card gets
/// its own target and the assignment is stable across runs.
pub fn card_dir_names(cards: &[Card]) -> Vec<String> {
    let mut scopes: HashMap<(&str, bool), UniqueNames> = HashMap::new();
    cards
        .iter()
        .map(|card| {
            scopes
                .entry((card.id_list.as_str(), card.closed))
                .or_default()
                .claim(&sanitize_path_name(&card.name))
        })
        .collect()
}

/// Target directory of a regular card, `name` being its segment from [`card_dir_names`]
///
/// - open: `{board}/{list}/{card}`
/// - archived: `{board}/{list}/{card} (ARCHIVED)`
/// - archived with `split_archived`: `{board}/ARCHIVED/{list}/{card}`
pub fn card_dir(
    board_dir: &Path,
    list_name: &str,
    card: &Card,
    name: &str,
    split_archived: bool,
) -> PathBuf {
    let list = sanitize_path_name(list_name);

    match (card.closed, split_archived) {
        (false, _) => board_dir.join(list).join(name),
        (true, false) => board_dir.join(list).join(format!("{name}{ARCHIVED_SUFFIX}")),
        (true, true) => board_dir.join(ARCHIVED_DIR).join(list).join(name),
    }
}

/// Target file of a link card: `{board}/{list}/Link Cards Only/CARD - {clean}.md`
///
/// The card name of a link card is its URL, so the sanitized scheme residue
/// (`https---`, `http---`) is stripped from the file name.
pub fn link_card_file(board_dir: &Path, list_name: &str, card_name: &str) -> PathBuf {
    let clean = sanitize_path_name(card_name)
        .replace("https---", "")
        .replace("http---", "");

    board_dir
        .join(sanitize_path_name(list_name))
        .join(LINK_CARDS_DIR)
        .join(format!("CARD - {clean}.md"))
}

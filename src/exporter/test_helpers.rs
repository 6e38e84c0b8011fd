//! Shared test helpers: an in-memory board source and model builders.

use crate::api::{
    Action, ActionData, Attachment, Board, BoardPrefs, BoardSource, Card, CheckItem, Checklist,
    Cover, Label, List, Member,
};
use crate::config::{Config, ExportConfig};
use crate::error::{Error, Result};
use crate::exporter::Exporter;
use crate::types::{ActionFilter, CardFilter};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory [`BoardSource`] with call counting and failure injection.
///
/// The comprehensive card fetch is assembled from the per-card maps, so tests set up
/// attachments/actions/checklists once and both the fast path and the fallbacks see
/// the same data.
#[derive(Default)]
pub(crate) struct MockSource {
    pub(crate) board: Board,
    lists: Vec<List>,
    labels: Vec<Label>,
    members: Vec<Member>,
    cards: Vec<Card>,
    roles: HashMap<String, String>,
    checklists: HashMap<String, Checklist>,
    actions: HashMap<String, Vec<Action>>,
    attachments: HashMap<String, Vec<Attachment>>,
    card_members: HashMap<String, Vec<Member>>,
    card_labels: HashMap<String, Vec<Label>>,
    files: HashMap<String, Vec<u8>>,
    failing: HashSet<&'static str>,
    failing_on: HashSet<(&'static str, String)>,
    calls: Mutex<HashMap<&'static str, usize>>,
    delay: Option<Duration>,
}

impl MockSource {
    pub(crate) fn new(board: Board) -> Self {
        Self {
            board,
            ..Default::default()
        }
    }

    pub(crate) fn with_lists(mut self, lists: Vec<List>) -> Self {
        self.lists = lists;
        self
    }

    pub(crate) fn with_labels(mut self, labels: Vec<Label>) -> Self {
        self.labels = labels;
        self
    }

    pub(crate) fn with_members(mut self, members: Vec<Member>) -> Self {
        self.members = members;
        self
    }

    pub(crate) fn with_cards(mut self, cards: Vec<Card>) -> Self {
        self.cards = cards;
        self
    }

    pub(crate) fn with_role(mut self, card_id: &str, role: &str) -> Self {
        self.roles.insert(card_id.into(), role.into());
        self
    }

    /// Register a checklist and attach its ID to the card
    pub(crate) fn with_checklist(mut self, card_id: &str, checklist: Checklist) -> Self {
        if let Some(card) = self.cards.iter_mut().find(|c| c.id == card_id) {
            card.id_checklists.push(checklist.id.clone());
        }
        self.checklists.insert(checklist.id.clone(), checklist);
        self
    }

    pub(crate) fn with_actions(mut self, card_id: &str, actions: Vec<Action>) -> Self {
        self.actions.insert(card_id.into(), actions);
        self
    }

    pub(crate) fn with_attachments(mut self, card_id: &str, attachments: Vec<Attachment>) -> Self {
        self.attachments.insert(card_id.into(), attachments);
        self
    }

    pub(crate) fn with_card_members(mut self, card_id: &str, members: Vec<Member>) -> Self {
        self.card_members.insert(card_id.into(), members);
        self
    }

    pub(crate) fn with_card_labels(mut self, card_id: &str, labels: Vec<Label>) -> Self {
        self.card_labels.insert(card_id.into(), labels);
        self
    }

    /// Bytes served for a URL (plain downloads) or an attachment ID
    pub(crate) fn with_file(mut self, key: &str, bytes: &[u8]) -> Self {
        self.files.insert(key.into(), bytes.to_vec());
        self
    }

    /// Fail every call of the named operation
    pub(crate) fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Fail the named operation for one resource ID only
    pub(crate) fn failing_on(mut self, operation: &'static str, id: &str) -> Self {
        self.failing_on.insert((operation, id.to_string()));
        self
    }

    /// Sleep this long in every call, to keep workers busy
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How often the named operation was called
    pub(crate) fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    async fn enter(&self, operation: &'static str, id: &str) -> Result<()> {
        *self.calls.lock().unwrap().entry(operation).or_default() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(operation)
            || self.failing_on.contains(&(operation, id.to_string()))
        {
            return Err(Error::Api {
                status: 500,
                message: format!("injected {operation} failure"),
            });
        }
        Ok(())
    }

    fn card(&self, card_id: &str) -> Result<&Card> {
        self.cards
            .iter()
            .find(|c| c.id == card_id)
            .ok_or_else(|| Error::NotFound(format!("card {card_id}")))
    }
}

#[async_trait]
impl BoardSource for MockSource {
    async fn fetch_board(&self, board_id: &str) -> Result<Board> {
        self.enter("fetch_board", board_id).await?;
        if self.board.id == board_id {
            Ok(self.board.clone())
        } else {
            Err(Error::NotFound(format!("board {board_id}")))
        }
    }

    async fn fetch_lists(&self, board_id: &str) -> Result<Vec<List>> {
        self.enter("fetch_lists", board_id).await?;
        Ok(self.lists.clone())
    }

    async fn fetch_list(&self, list_id: &str) -> Result<List> {
        self.enter("fetch_list", list_id).await?;
        self.lists
            .iter()
            .find(|l| l.id == list_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("list {list_id}")))
    }

    async fn fetch_board_labels(&self, board_id: &str) -> Result<Vec<Label>> {
        self.enter("fetch_board_labels", board_id).await?;
        Ok(self.labels.clone())
    }

    async fn fetch_board_members(&self, board_id: &str) -> Result<Vec<Member>> {
        self.enter("fetch_board_members", board_id).await?;
        Ok(self.members.clone())
    }

    async fn fetch_cards(&self, board_id: &str, filter: CardFilter) -> Result<Vec<Card>> {
        self.enter("fetch_cards", board_id).await?;
        Ok(self
            .cards
            .iter()
            .filter(|c| filter == CardFilter::All || !c.closed)
            .cloned()
            .collect())
    }

    async fn search_cards_by_label(
        &self,
        board_id: &str,
        label_name: &str,
    ) -> Result<Vec<Card>> {
        self.enter("search_cards_by_label", board_id).await?;
        Ok(self
            .cards
            .iter()
            .filter(|c| !c.closed)
            .filter(|c| {
                self.card_labels
                    .get(&c.id)
                    .is_some_and(|labels| labels.iter().any(|l| l.name == label_name))
            })
            .cloned()
            .collect())
    }

    async fn fetch_card_role(&self, card_id: &str) -> Result<Option<String>> {
        self.enter("fetch_card_role", card_id).await?;
        Ok(self.roles.get(card_id).cloned())
    }

    async fn fetch_card_comprehensive(&self, card_id: &str) -> Result<Card> {
        self.enter("fetch_card_comprehensive", card_id).await?;
        let mut card = self.card(card_id)?.clone();
        card.attachments = Some(self.attachments.get(card_id).cloned().unwrap_or_default());
        card.actions = Some(self.actions.get(card_id).cloned().unwrap_or_default());
        card.members = Some(self.card_members.get(card_id).cloned().unwrap_or_default());
        card.labels = Some(self.card_labels.get(card_id).cloned().unwrap_or_default());
        card.checklists = Some(
            card.id_checklists
                .iter()
                .filter_map(|id| self.checklists.get(id).cloned())
                .collect(),
        );
        Ok(card)
    }

    async fn fetch_attachments(&self, card_id: &str) -> Result<Vec<Attachment>> {
        self.enter("fetch_attachments", card_id).await?;
        Ok(self.attachments.get(card_id).cloned().unwrap_or_default())
    }

    async fn fetch_checklist(&self, checklist_id: &str) -> Result<Checklist> {
        self.enter("fetch_checklist", checklist_id).await?;
        self.checklists
            .get(checklist_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("checklist {checklist_id}")))
    }

    async fn fetch_actions(&self, card_id: &str, filter: ActionFilter) -> Result<Vec<Action>> {
        self.enter("fetch_actions", card_id).await?;
        let actions = self.actions.get(card_id).cloned().unwrap_or_default();
        Ok(match filter {
            ActionFilter::All => actions,
            ActionFilter::Comments => actions.into_iter().filter(Action::is_comment).collect(),
        })
    }

    async fn fetch_card_members(&self, card_id: &str) -> Result<Vec<Member>> {
        self.enter("fetch_card_members", card_id).await?;
        Ok(self.card_members.get(card_id).cloned().unwrap_or_default())
    }

    async fn fetch_card_labels(&self, card_id: &str) -> Result<Vec<Label>> {
        self.enter("fetch_card_labels", card_id).await?;
        Ok(self.card_labels.get(card_id).cloned().unwrap_or_default())
    }

    async fn download_file(&self, url: &str) -> Result<Vec<u8>> {
        self.enter("download_file", url).await?;
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| Error::NotFound(url.to_string()))
    }

    async fn download_attachment(
        &self,
        card_id: &str,
        attachment_id: &str,
        file_name: &str,
    ) -> Result<Vec<u8>> {
        self.enter("download_attachment", attachment_id).await?;
        let _ = card_id;
        Ok(self
            .files
            .get(attachment_id)
            .cloned()
            .unwrap_or_else(|| file_name.as_bytes().to_vec()))
    }
}

// ---------------------------------------------------------------------------
// Model builders
// ---------------------------------------------------------------------------

pub(crate) fn board(id: &str, name: &str) -> Board {
    Board {
        id: id.into(),
        name: name.into(),
        prefs: BoardPrefs::default(),
    }
}

pub(crate) fn list(id: &str, name: &str) -> List {
    List {
        id: id.into(),
        name: name.into(),
        id_board: "b1".into(),
        closed: false,
    }
}

pub(crate) fn card(id: &str, name: &str, list_id: &str) -> Card {
    Card {
        id: id.into(),
        name: name.into(),
        id_list: list_id.into(),
        ..Default::default()
    }
}

pub(crate) fn closed_card(id: &str, name: &str, list_id: &str) -> Card {
    Card {
        closed: true,
        ..card(id, name, list_id)
    }
}

pub(crate) fn member(id: &str, full_name: &str) -> Member {
    Member {
        id: id.into(),
        full_name: Some(full_name.into()),
        username: None,
    }
}

pub(crate) fn label(id: &str, name: &str, color: &str) -> Label {
    Label {
        id: id.into(),
        name: name.into(),
        color: Some(color.into()),
    }
}

pub(crate) fn action(action_type: &str, author: Option<&str>, text: &str) -> Action {
    Action {
        id: format!("act-{action_type}-{text}"),
        action_type: action_type.into(),
        date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        member_creator: author.map(|name| member("m-author", name)),
        data: ActionData {
            text: Some(text.into()),
        },
    }
}

pub(crate) fn checklist(id: &str, name: &str, items: &[(&str, bool)]) -> Checklist {
    Checklist {
        id: id.into(),
        name: name.into(),
        check_items: items
            .iter()
            .enumerate()
            .map(|(i, (item, done))| CheckItem {
                id: format!("{id}-{i}"),
                name: (*item).into(),
                state: if *done { "complete" } else { "incomplete" }.into(),
            })
            .collect(),
    }
}

pub(crate) fn upload(id: &str, name: &str) -> Attachment {
    Attachment {
        id: id.into(),
        name: name.into(),
        url: format!("https://files.example.com/{name}"),
        is_upload: true,
    }
}

pub(crate) fn link_attachment(id: &str, url: &str) -> Attachment {
    Attachment {
        id: id.into(),
        name: url.into(),
        url: url.into(),
        is_upload: false,
    }
}

pub(crate) fn color_cover(color: &str) -> Option<Cover> {
    Some(Cover {
        color: Some(color.into()),
        id_attachment: None,
    })
}

pub(crate) fn image_cover(attachment_id: &str) -> Option<Cover> {
    Some(Cover {
        color: None,
        id_attachment: Some(attachment_id.into()),
    })
}

// ---------------------------------------------------------------------------
// Exporter wiring
// ---------------------------------------------------------------------------

pub(crate) fn test_config(storage_dir: &Path, board_ids: &[&str]) -> Config {
    Config {
        board_ids: board_ids.iter().map(|id| id.to_string()).collect(),
        export: ExportConfig {
            storage_dir: storage_dir.to_path_buf(),
            concurrency: 3,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub(crate) fn test_exporter(config: Config, source: MockSource) -> (Exporter, Arc<MockSource>) {
    let source = Arc::new(source);
    let exporter = Exporter::new(config, source.clone());
    (exporter, source)
}

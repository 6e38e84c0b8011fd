//! Two-tier card resource fetching
//!
//! The first tier is one enriched request per card that inlines attachments, the full
//! action history, members, labels and checklists. Every accessor checks whether its
//! collection came back on the card and only issues its own request when it did not,
//! so a failed or partial enriched fetch degrades field by field.

use super::card_context;
use super::report::ErrorHandler;
use crate::api::{Action, Attachment, BoardSource, Card, Checklist, Label, Member};
use crate::error::ExportError;
use crate::types::ActionFilter;
use std::borrow::Cow;
use std::sync::Arc;

/// Per-card fetcher shared by all workers of a board
#[derive(Clone)]
pub struct CardFetcher {
    source: Arc<dyn BoardSource>,
    handler: Arc<ErrorHandler>,
}

impl CardFetcher {
    /// Create a fetcher over `source`, reporting non-fatal failures to `handler`
    pub fn new(source: Arc<dyn BoardSource>, handler: Arc<ErrorHandler>) -> Self {
        Self { source, handler }
    }

    /// Fetch the enriched card, or fall back to the lightweight one
    ///
    /// A failure is a warning: the renderer still works off the lightweight card, whose
    /// unset collections route every accessor to its own fallback request.
    pub async fn comprehensive(&self, card: &Card) -> Card {
        match self.source.fetch_card_comprehensive(&card.id).await {
            Ok(full) => full,
            Err(e) => {
                self.handler.handle(&ExportError::warning(
                    "get comprehensive card data",
                    card_context(card),
                    e,
                ));
                card.clone()
            }
        }
    }

    /// Attachments of the card
    pub async fn attachments<'c>(
        &self,
        card: &'c Card,
    ) -> Result<Cow<'c, [Attachment]>, ExportError> {
        if let Some(attachments) = &card.attachments {
            return Ok(Cow::Borrowed(attachments));
        }
        self.source
            .fetch_attachments(&card.id)
            .await
            .map(Cow::Owned)
            .map_err(|e| ExportError::error("get attachments", card_context(card), e))
    }

    /// Comment actions of the card
    ///
    /// Filtered out of the inlined history when present, otherwise fetched with the
    /// comment-only action filter.
    pub async fn comments<'c>(&self, card: &'c Card) -> Result<Cow<'c, [Action]>, ExportError> {
        if let Some(actions) = &card.actions {
            return Ok(Cow::Owned(
                actions.iter().filter(|a| a.is_comment()).cloned().collect(),
            ));
        }
        self.source
            .fetch_actions(&card.id, ActionFilter::Comments)
            .await
            .map(Cow::Owned)
            .map_err(|e| ExportError::error("get comments", card_context(card), e))
    }

    /// Full activity history of the card
    pub async fn history<'c>(&self, card: &'c Card) -> Result<Cow<'c, [Action]>, ExportError> {
        if let Some(actions) = &card.actions {
            return Ok(Cow::Borrowed(actions));
        }
        self.source
            .fetch_actions(&card.id, ActionFilter::All)
            .await
            .map(Cow::Owned)
            .map_err(|e| ExportError::error("get history", card_context(card), e))
    }

    /// Members assigned to the card
    pub async fn members<'c>(&self, card: &'c Card) -> Result<Cow<'c, [Member]>, ExportError> {
        if let Some(members) = &card.members {
            return Ok(Cow::Borrowed(members));
        }
        self.source
            .fetch_card_members(&card.id)
            .await
            .map(Cow::Owned)
            .map_err(|e| ExportError::error("get members", card_context(card), e))
    }

    /// Labels on the card
    pub async fn labels<'c>(&self, card: &'c Card) -> Result<Cow<'c, [Label]>, ExportError> {
        if let Some(labels) = &card.labels {
            return Ok(Cow::Borrowed(labels));
        }
        self.source
            .fetch_card_labels(&card.id)
            .await
            .map(Cow::Owned)
            .map_err(|e| ExportError::error("get labels", card_context(card), e))
    }

    /// Checklists of the card, in `id_checklists` order
    ///
    /// Without inlined checklists each ID is fetched on its own. A failed checklist is
    /// reported and skipped; the others are still returned.
    pub async fn checklists<'c>(&self, card: &'c Card) -> Cow<'c, [Checklist]> {
        if let Some(checklists) = &card.checklists {
            return Cow::Borrowed(checklists);
        }

        let mut checklists = Vec::with_capacity(card.id_checklists.len());
        for id in card.id_checklists.iter().filter(|id| !id.is_empty()) {
            match self.source.fetch_checklist(id).await {
                Ok(checklist) => checklists.push(checklist),
                Err(e) => self.handler.handle(&ExportError::error(
                    "get checklist",
                    format!("checklist {id} of {}", card_context(card)),
                    e,
                )),
            }
        }
        Cow::Owned(checklists)
    }
}

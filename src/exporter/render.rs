//! Per-card Markdown and attachment rendering
//!
//! Every sub-resource is rendered by its own step returning its own `Result`, and
//! every step runs even when an earlier one failed. Steps that could not retrieve their
//! collection leave no file behind; steps that retrieved an empty collection still
//! write an (empty) file, so a missing file always means "not processed".
//!
//! Markdown is rendered into a [`PooledBuffer`] owned by the card job and then written
//! in one call.

use super::card_context;
use super::fetcher::CardFetcher;
use super::report::ErrorHandler;
use crate::api::{Action, Attachment, BoardSource, Card, Checklist, CoverKind, Label, Member};
use crate::buffer_pool::{BufferPool, PooledBuffer};
use crate::error::{ExportError, Severity};
use crate::utils::{UniqueNames, sanitize_path_name, with_name_suffix};
use chrono::{DateTime, Utc};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Timestamp format used in every rendered file
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Inserted before the extension of the attachment used as card cover
pub const CARD_COVER_SUFFIX: &str = " (Card Cover)";

/// Placeholder for a member without a display name
pub const UNKNOWN_MEMBER: &str = "Unknown Member";

/// Placeholder for a member without an ID
pub const UNKNOWN_ID: &str = "Unknown ID";

/// Card directory entries
pub mod files {
    /// Card description
    pub const DESCRIPTION: &str = "CardDescription.md";
    /// Attachments directory
    pub const ATTACHMENTS_DIR: &str = "attachments";
    /// URL attachments, one per line (inside [`ATTACHMENTS_DIR`])
    pub const URL_ATTACHMENTS: &str = "URL-Attachments.md";
    /// Checklists directory
    pub const CHECKLISTS_DIR: &str = "checklists";
    /// Comments
    pub const COMMENTS: &str = "CardComments.md";
    /// Card members
    pub const USERS: &str = "CardUsers.md";
    /// Card labels
    pub const LABELS: &str = "CardLabels.md";
    /// Activity history
    pub const HISTORY: &str = "CardHistory.md";
    /// Due date (open, or no due date)
    pub const DUE_DATE: &str = "CardDueDate.md";
    /// Due date marked complete
    pub const DUE_DATE_COMPLETED: &str = "CardDueDate (Completed).md";
    /// Start date
    pub const START_DATE: &str = "CardStartDate.md";
    /// Solid cover color
    pub const COVER_COLOR: &str = "CardCoverColor.md";
}

/// Writes cards to disk
#[derive(Clone)]
pub struct CardRenderer {
    source: Arc<dyn BoardSource>,
    fetcher: CardFetcher,
    buffers: BufferPool,
    handler: Arc<ErrorHandler>,
}

impl CardRenderer {
    /// Create a renderer sharing the board's source, fetcher, pool and handler
    pub fn new(
        source: Arc<dyn BoardSource>,
        fetcher: CardFetcher,
        buffers: BufferPool,
        handler: Arc<ErrorHandler>,
    ) -> Self {
        Self {
            source,
            fetcher,
            buffers,
            handler,
        }
    }

    /// Write every sub-resource of a regular card into `dir`
    ///
    /// `dir` must already exist. Non-critical failures are passed to the handler as they
    /// occur. If any step failed critically, the first critical failure is returned and
    /// later ones are passed to the handler.
    pub async fn render(&self, card: &Card, dir: &Path) -> Result<(), ExportError> {
        tracing::info!(card_id = %card.id, path = %dir.display(), "dumping card");
        let mut buf = self.buffers.acquire();

        let outcomes = [
            self.description(card, dir).await,
            self.attachments(card, dir, &mut buf).await,
            self.checklists(card, dir, &mut buf).await,
            self.comments(card, dir, &mut buf).await,
            self.members(card, dir, &mut buf).await,
            self.labels(card, dir, &mut buf).await,
            self.history(card, dir, &mut buf).await,
            self.due_date(card, dir).await,
            self.start_date(card, dir).await,
            self.cover(card, dir).await,
        ];

        let mut first_critical = None;
        for err in outcomes.into_iter().filter_map(Result::err) {
            if err.severity == Severity::Critical && first_critical.is_none() {
                first_critical = Some(err);
            } else {
                self.handler.handle(&err);
            }
        }

        match first_critical {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Write a link card's pointer file, creating its directory
    pub async fn render_link(&self, card: &Card, file: &Path) -> Result<(), ExportError> {
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ExportError::critical("create link cards directory", card_context(card), e)
            })?;
        }
        write_file(file, card.name.as_bytes())
            .await
            .map_err(|e| ExportError::critical("write link card", card_context(card), e))?;
        tracing::info!(card_id = %card.id, path = %file.display(), "wrote link card");
        Ok(())
    }

    async fn description(&self, card: &Card, dir: &Path) -> Result<(), ExportError> {
        write_file(&dir.join(files::DESCRIPTION), card.desc.as_bytes())
            .await
            .map_err(|e| ExportError::critical("write card description", card_context(card), e))
    }

    async fn attachments(
        &self,
        card: &Card,
        dir: &Path,
        buf: &mut PooledBuffer,
    ) -> Result<(), ExportError> {
        let attachments = self.fetcher.attachments(card).await?;
        let attachments_dir = dir.join(files::ATTACHMENTS_DIR);
        tokio::fs::create_dir_all(&attachments_dir)
            .await
            .map_err(|e| {
                ExportError::critical("create attachments directory", card_context(card), e)
            })?;

        if attachments.is_empty() {
            tracing::debug!(card_id = %card.id, "no attachments");
        }
        let mut names = UniqueNames::default();
        names.reserve(files::URL_ATTACHMENTS);
        for attachment in attachments.iter().filter(|a| a.is_upload) {
            let file_name = names.claim_file(&upload_file_name(card, attachment));
            self.save_upload(card, attachment, &attachments_dir.join(file_name))
                .await;
        }

        let links: Vec<&Attachment> = attachments.iter().filter(|a| !a.is_upload).collect();
        self.write_rendered(
            card,
            attachments_dir.join(files::URL_ATTACHMENTS),
            "write URL attachments",
            buf,
            |out| render_url_attachments(out, links.iter().copied()),
        )
        .await
    }

    /// Download one uploaded attachment to `path`; failures only skip this file
    async fn save_upload(&self, card: &Card, attachment: &Attachment, path: &Path) {
        let context = || format!("attachment {} of {}", attachment.name, card_context(card));

        let bytes = match self
            .source
            .download_attachment(&card.id, &attachment.id, &attachment.name)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                self.handler
                    .handle(&ExportError::error("download attachment", context(), e));
                return;
            }
        };

        match write_file(path, &bytes).await {
            Ok(()) => tracing::debug!(
                card_id = %card.id,
                path = %path.display(),
                bytes = bytes.len(),
                "saved attachment"
            ),
            Err(e) => self
                .handler
                .handle(&ExportError::critical("write attachment", context(), e)),
        }
    }

    async fn checklists(
        &self,
        card: &Card,
        dir: &Path,
        buf: &mut PooledBuffer,
    ) -> Result<(), ExportError> {
        let checklists = self.fetcher.checklists(card).await;
        let checklists_dir = dir.join(files::CHECKLISTS_DIR);
        tokio::fs::create_dir_all(&checklists_dir)
            .await
            .map_err(|e| {
                ExportError::critical("create checklists directory", card_context(card), e)
            })?;

        // Every checklist is attempted; the first failure is returned, later ones handled
        let mut names = ChecklistNames::default();
        let mut first_failure = None;
        for checklist in checklists.iter() {
            let path = checklists_dir.join(names.file_name(&checklist.name));
            let written = self
                .write_rendered(card, path, "write checklist", buf, |out| {
                    render_checklist(out, checklist)
                })
                .await;
            if let Err(err) = written {
                if first_failure.is_none() {
                    first_failure = Some(err);
                } else {
                    self.handler.handle(&err);
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn comments(
        &self,
        card: &Card,
        dir: &Path,
        buf: &mut PooledBuffer,
    ) -> Result<(), ExportError> {
        let comments = self.fetcher.comments(card).await?;
        if comments.is_empty() {
            tracing::debug!(card_id = %card.id, "no comments");
        }
        self.write_rendered(card, dir.join(files::COMMENTS), "write comments", buf, |out| {
            render_comments(out, &comments)
        })
        .await
    }

    async fn members(
        &self,
        card: &Card,
        dir: &Path,
        buf: &mut PooledBuffer,
    ) -> Result<(), ExportError> {
        let members = self.fetcher.members(card).await?;
        self.write_rendered(card, dir.join(files::USERS), "write members", buf, |out| {
            render_members(out, &members)
        })
        .await
    }

    async fn labels(
        &self,
        card: &Card,
        dir: &Path,
        buf: &mut PooledBuffer,
    ) -> Result<(), ExportError> {
        let labels = self.fetcher.labels(card).await?;
        self.write_rendered(card, dir.join(files::LABELS), "write labels", buf, |out| {
            render_labels(out, &labels)
        })
        .await
    }

    async fn history(
        &self,
        card: &Card,
        dir: &Path,
        buf: &mut PooledBuffer,
    ) -> Result<(), ExportError> {
        let history = self.fetcher.history(card).await?;
        self.write_rendered(card, dir.join(files::HISTORY), "write history", buf, |out| {
            render_history(out, &history)
        })
        .await
    }

    async fn due_date(&self, card: &Card, dir: &Path) -> Result<(), ExportError> {
        let (file_name, contents) = match card.due {
            Some(due) if card.due_complete => (files::DUE_DATE_COMPLETED, format_date(&due)),
            Some(due) => (files::DUE_DATE, format_date(&due)),
            None => {
                tracing::debug!(card_id = %card.id, "no due date");
                (files::DUE_DATE, String::new())
            }
        };
        write_file(&dir.join(file_name), contents.as_bytes())
            .await
            .map_err(|e| ExportError::critical("write due date", card_context(card), e))
    }

    async fn start_date(&self, card: &Card, dir: &Path) -> Result<(), ExportError> {
        let contents = card.start.as_ref().map(format_date).unwrap_or_default();
        write_file(&dir.join(files::START_DATE), contents.as_bytes())
            .await
            .map_err(|e| ExportError::critical("write start date", card_context(card), e))
    }

    async fn cover(&self, card: &Card, dir: &Path) -> Result<(), ExportError> {
        match card.cover_kind() {
            CoverKind::Color(color) => write_file(&dir.join(files::COVER_COLOR), color.as_bytes())
                .await
                .map_err(|e| ExportError::critical("write cover color", card_context(card), e)),
            CoverKind::Image(attachment_id) => {
                tracing::debug!(
                    card_id = %card.id,
                    attachment_id,
                    "cover is an image, saved with the attachments"
                );
                Ok(())
            }
            CoverKind::None => {
                tracing::debug!(card_id = %card.id, "no cover set");
                Ok(())
            }
        }
    }

    /// Render into the job buffer, then write it to `path`
    async fn write_rendered<F>(
        &self,
        card: &Card,
        path: PathBuf,
        operation: &'static str,
        buf: &mut PooledBuffer,
        render: F,
    ) -> Result<(), ExportError>
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        buf.reset();
        render(&mut **buf).map_err(|e| ExportError::critical(operation, card_context(card), e))?;
        write_file(&path, buf.as_slice())
            .await
            .map_err(|e| ExportError::critical(operation, card_context(card), e))?;
        tracing::debug!(card_id = %card.id, path = %path.display(), "wrote file");
        Ok(())
    }
}

/// Assigns checklist file names, numbering repeated names per card
///
/// `Tasks`, `Tasks`, `Notes`, `Notes` become `Tasks.md`, `Tasks 1.md`, `Notes.md`,
/// `Notes 2.md`: the counter is shared by all names on the card and only grows.
#[derive(Debug, Default)]
pub struct ChecklistNames {
    names: UniqueNames,
}

impl ChecklistNames {
    /// Next unused file name for a checklist called `name`
    pub fn file_name(&mut self, name: &str) -> String {
        format!("{}.md", self.names.claim(&sanitize_path_name(name)))
    }
}

/// Sanitized file name of an upload, marked when it is the card cover
fn upload_file_name(card: &Card, attachment: &Attachment) -> String {
    let file_name = sanitize_path_name(&attachment.name);
    if card.is_cover_attachment(&attachment.id) {
        with_name_suffix(&file_name, CARD_COVER_SUFFIX)
    } else {
        file_name
    }
}

/// Write a file with owner-only permissions, replacing existing contents
pub(crate) async fn write_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.flush().await
}

/// Format a timestamp the way every rendered file shows it
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn member_name(member: Option<&Member>) -> &str {
    member
        .and_then(|m| m.full_name.as_deref())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_MEMBER)
}

/// One URL per line
pub fn render_url_attachments<'a>(
    out: &mut impl Write,
    links: impl IntoIterator<Item = &'a Attachment>,
) -> io::Result<()> {
    for link in links {
        writeln!(out, "{}", link.url)?;
    }
    Ok(())
}

/// `- [x] item` / `- [ ] item` per check item
pub fn render_checklist(out: &mut impl Write, checklist: &Checklist) -> io::Result<()> {
    for item in &checklist.check_items {
        let mark = if item.is_complete() { 'x' } else { ' ' };
        writeln!(out, "- [{mark}] {}", item.name)?;
    }
    Ok(())
}

/// `**{author}** ({date}): {text}` per comment
pub fn render_comments(out: &mut impl Write, comments: &[Action]) -> io::Result<()> {
    for comment in comments {
        writeln!(
            out,
            "**{}** ({}): {}",
            member_name(comment.member_creator.as_ref()),
            format_date(&comment.date),
            comment.data.text.as_deref().unwrap_or_default()
        )?;
    }
    Ok(())
}

/// `**{name}** ({id})` per member
pub fn render_members(out: &mut impl Write, members: &[Member]) -> io::Result<()> {
    for member in members {
        let id = if member.id.is_empty() {
            UNKNOWN_ID
        } else {
            member.id.as_str()
        };
        writeln!(out, "**{}** ({id})", member_name(Some(member)))?;
    }
    Ok(())
}

/// `**{name}** - {color} ({id})` per label
pub fn render_labels(out: &mut impl Write, labels: &[Label]) -> io::Result<()> {
    for label in labels {
        writeln!(
            out,
            "**{}** - {} ({})",
            label.name,
            label.color.as_deref().unwrap_or_default(),
            label.id
        )?;
    }
    Ok(())
}

/// `**{type}** ({date}): {author} - {text}` per action
pub fn render_history(out: &mut impl Write, actions: &[Action]) -> io::Result<()> {
    for action in actions {
        writeln!(
            out,
            "**{}** ({}): {} - {}",
            action.action_type,
            format_date(&action.date),
            member_name(action.member_creator.as_ref()),
            action.data.text.as_deref().unwrap_or_default()
        )?;
    }
    Ok(())
}

/// Markdown table of board labels (`Label Name | Label Color | Label UID`)
///
/// Empty names render as `No Name`, missing colors as `No Color`.
pub fn render_labels_table(out: &mut impl Write, labels: &[Label]) -> io::Result<()> {
    writeln!(out, "| Label Name | Label Color | Label UID |")?;
    writeln!(out, "| --- | --- | --- |")?;
    for label in labels {
        let name = if label.name.is_empty() {
            "No Name"
        } else {
            label.name.as_str()
        };
        let color = label
            .color
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("No Color");
        writeln!(
            out,
            "| {} | {} | {} |",
            escape_cell(name),
            escape_cell(color),
            label.id
        )?;
    }
    Ok(())
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

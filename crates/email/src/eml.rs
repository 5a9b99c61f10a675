use mailparse::{parse_mail, MailHeaderMap, ParsedMail};
use std::path::{Path, PathBuf};

use crate::mailbox::{Attachment, Mailbox, MailboxError, MessageFilter, MessageRef};

/// Sub-directory processed messages are moved into.
pub const PROCESSED_DIR: &str = "Processado";

/// Mailbox backed by a directory of `.eml` files, e.g. an export or a
/// maildir-style drop folder. Only files directly in `inbox` are considered.
#[derive(Debug, Clone)]
pub struct EmlDirectoryMailbox {
    inbox: PathBuf,
    filter: MessageFilter,
}

impl EmlDirectoryMailbox {
    pub fn new(inbox: impl Into<PathBuf>, filter: MessageFilter) -> Self {
        Self {
            inbox: inbox.into(),
            filter,
        }
    }

    pub fn inbox(&self) -> &Path {
        &self.inbox
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.inbox.join(PROCESSED_DIR)
    }

    async fn eml_files(&self) -> Result<Vec<PathBuf>, MailboxError> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.inbox).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_eml = path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.eq_ignore_ascii_case("eml"));
            if is_eml && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn message_path(&self, message: &MessageRef) -> PathBuf {
        self.inbox.join(&message.id)
    }
}

fn attachment_name(part: &ParsedMail) -> Option<String> {
    part.get_content_disposition()
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn collect_attachments(part: &ParsedMail, out: &mut Vec<Attachment>) -> Result<(), MailboxError> {
    if part.subparts.is_empty() {
        if let Some(filename) = attachment_name(part) {
            out.push(Attachment {
                filename,
                data: part.get_body_raw()?,
            });
        }
        return Ok(());
    }
    for sub in &part.subparts {
        collect_attachments(sub, out)?;
    }
    Ok(())
}

fn has_attachment(part: &ParsedMail) -> bool {
    if part.subparts.is_empty() {
        return attachment_name(part).is_some();
    }
    part.subparts.iter().any(has_attachment)
}

impl Mailbox for EmlDirectoryMailbox {
    async fn find_statement_messages(&self) -> Result<Vec<MessageRef>, MailboxError> {
        let mut found = Vec::new();
        for path in self.eml_files().await? {
            let bytes = tokio::fs::read(&path).await?;
            let mail = match parse_mail(&bytes) {
                Ok(mail) => mail,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable message");
                    continue;
                }
            };
            let from = mail.headers.get_first_value("From").unwrap_or_default();
            let subject = mail.headers.get_first_value("Subject").unwrap_or_default();
            if !self.filter.matches(&from, &subject) || !has_attachment(&mail) {
                continue;
            }
            let Some(id) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            found.push(MessageRef {
                id: id.to_string(),
                from,
                subject,
            });
        }
        tracing::debug!(count = found.len(), inbox = %self.inbox.display(), "statement messages found");
        Ok(found)
    }

    async fn fetch_attachments(&self, message: &MessageRef) -> Result<Vec<Attachment>, MailboxError> {
        let bytes = tokio::fs::read(self.message_path(message)).await?;
        let mail = parse_mail(&bytes)?;
        let mut attachments = Vec::new();
        collect_attachments(&mail, &mut attachments)?;
        Ok(attachments)
    }

    async fn mark_processed(&self, message: &MessageRef) -> Result<(), MailboxError> {
        let dest_dir = self.processed_dir();
        tokio::fs::create_dir_all(&dest_dir).await?;
        tokio::fs::rename(self.message_path(message), dest_dir.join(&message.id)).await?;
        tracing::debug!(message = %message.id, "message marked processed");
        Ok(())
    }
}

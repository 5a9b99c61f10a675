use extrato_import::ImportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("Mailbox service error: {0}")]
    Remote(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse message: {0}")]
    Mime(#[from] mailparse::MailParseError),
    #[error("Attachment '{filename}' rejected: {source}")]
    Import {
        filename: String,
        #[source]
        source: ImportError,
    },
}

/// A message found in the inbox. `id` is whatever the mailbox needs to find it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
    pub from: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Source of forwarded statement messages.
#[allow(async_fn_in_trait)]
pub trait Mailbox {
    /// Unprocessed messages from the configured sender, with the configured
    /// subject, carrying at least one attachment.
    async fn find_statement_messages(&self) -> Result<Vec<MessageRef>, MailboxError>;

    async fn fetch_attachments(&self, message: &MessageRef) -> Result<Vec<Attachment>, MailboxError>;

    /// Moves the message out of the inbox so it is not found again.
    async fn mark_processed(&self, message: &MessageRef) -> Result<(), MailboxError>;
}

/// Sender and subject a statement message must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFilter {
    pub sender: String,
    pub subject: String,
}

impl MessageFilter {
    pub fn new(sender: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
        }
    }

    /// Case-insensitive containment on both headers.
    pub fn matches(&self, from: &str, subject: &str) -> bool {
        from.to_lowercase().contains(&self.sender.to_lowercase())
            && subject.to_lowercase().contains(&self.subject.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_display_name_address() {
        let f = MessageFilter::new("dev.baleeiro@gmail.com", "Fwd: Extrato da sua conta do Nubank");
        assert!(f.matches(
            "Dev <Dev.Baleeiro@gmail.com>",
            "Fwd: Extrato da sua conta do Nubank - março"
        ));
    }

    #[test]
    fn filter_rejects_other_sender_or_subject() {
        let f = MessageFilter::new("dev.baleeiro@gmail.com", "Extrato");
        assert!(!f.matches("someone@else.com", "Extrato"));
        assert!(!f.matches("dev.baleeiro@gmail.com", "Fatura"));
    }
}

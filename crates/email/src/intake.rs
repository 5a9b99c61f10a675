use extrato_core::Transaction;
use extrato_import::import::import_statement_file;
use extrato_import::{is_statement_filename, CategoryRuleSet};

use crate::mailbox::{Mailbox, MailboxError, MessageRef};

/// Transactions pulled out of one message.
#[derive(Debug, Clone)]
pub struct MessageBatch {
    pub message: MessageRef,
    /// Statement attachments that were imported.
    pub statements: Vec<String>,
    pub transactions: Vec<Transaction>,
}

/// Orchestrates: fetch attachments → stage to a temp dir → parse → validate.
/// Marking a message processed is left to the caller, once its rows are stored.
pub struct StatementIntake<'a, M: Mailbox> {
    mailbox: &'a M,
    rules: &'a CategoryRuleSet,
}

impl<'a, M: Mailbox> StatementIntake<'a, M> {
    pub fn new(mailbox: &'a M, rules: &'a CategoryRuleSet) -> Self {
        Self { mailbox, rules }
    }

    pub async fn pending(&self) -> Result<Vec<MessageRef>, MailboxError> {
        self.mailbox.find_statement_messages().await
    }

    /// Imports every statement attachment on `message` and combines them.
    /// Any invalid statement fails the whole message. The message is not moved.
    pub async fn process_message(&self, message: &MessageRef) -> Result<MessageBatch, MailboxError> {
        let attachments = self.mailbox.fetch_attachments(message).await?;
        let staging = tempfile::tempdir()?;

        let mut statements = Vec::new();
        let mut transactions = Vec::new();
        for attachment in attachments {
            if !is_statement_filename(&attachment.filename) {
                tracing::debug!(filename = %attachment.filename, "ignoring attachment");
                continue;
            }
            let path = staging.path().join(&attachment.filename);
            tokio::fs::write(&path, &attachment.data).await?;

            let batch = import_statement_file(&path, self.rules).map_err(|source| {
                MailboxError::Import {
                    filename: attachment.filename.clone(),
                    source,
                }
            })?;
            tracing::info!(
                filename = %attachment.filename,
                transactions = batch.len(),
                "statement imported"
            );
            transactions.extend(batch.into_transactions());
            statements.push(attachment.filename);
        }

        Ok(MessageBatch {
            message: message.clone(),
            statements,
            transactions,
        })
    }

    pub async fn mark_processed(&self, message: &MessageRef) -> Result<(), MailboxError> {
        self.mailbox.mark_processed(message).await
    }
}

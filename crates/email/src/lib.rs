pub mod eml;
pub mod intake;
pub mod mailbox;

pub use eml::{EmlDirectoryMailbox, PROCESSED_DIR};
pub use intake::{MessageBatch, StatementIntake};
pub use mailbox::{Attachment, Mailbox, MailboxError, MessageFilter, MessageRef};

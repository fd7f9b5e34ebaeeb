pub mod mailer;
pub mod sync_client;

pub use mailer::{InvitationEmail, LogMailer, MailError, Mailer};
pub use sync_client::{SyncClient, SyncError, SyncSession};

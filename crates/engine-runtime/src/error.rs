use thiserror::Error;

/// Failures of the background workers themselves, as opposed to the remote
/// calls they make.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("Mailbox of worker '{0}' is closed")]
    MailboxClosed(String),
}

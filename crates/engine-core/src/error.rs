use crate::{settings::SettingsError, translate::RemoteFailure};
use thiserror::Error;

/// Everything a cursor caller can observe going wrong.
#[derive(Debug, Error)]
pub enum CursorError {
    /// A remote call failed, either while submitting the query or while
    /// fetching a page in the background.
    #[error("Remote Exception: {message}")]
    Remote {
        message: String,
        #[source]
        source: RemoteFailure,
    },

    /// The background fetch worker stopped before delivering a page.
    #[error("Fetch worker interrupted: {0}")]
    WorkerInterrupted(String),

    #[error("Invalid query settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Query has already been executed on this cursor")]
    AlreadyStarted,

    #[error("No query has been executed on this cursor")]
    NotStarted,

    #[error("Cursor is not positioned on a row")]
    NoCurrentRow,

    /// The cursor was closed and the next row is not buffered locally.
    #[error("Cursor is closed")]
    Closed,

    /// A fetch failure was already reported; the page sequence is broken.
    #[error("Cursor failed earlier and can no longer advance")]
    Poisoned,
}

impl CursorError {
    /// The structured remote failure behind this error, if any.
    pub fn remote(&self) -> Option<&RemoteFailure> {
        match self {
            CursorError::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

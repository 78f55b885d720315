use crate::error::CursorError;
use connectors::error::{ServerException, ServiceError};
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};
use tracing::warn;

/// Converts failures of the remote service into cursor errors.
///
/// The cursor engine calls this for every failed remote call, both on the
/// caller's task and on the fetch worker.
pub trait ErrorTranslator: Send + Sync {
    fn translate(&self, error: ServiceError) -> CursorError;
}

/// One frame of a call stack captured on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub class: String,
    pub method: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}.{}", self.class, self.method)?;
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "({file}:{line})"),
            (Some(file), None) => write!(f, "({file})"),
            _ => write!(f, "(Unknown Source)"),
        }
    }
}

/// Serialize frames into the byte format carried by `ServerException::stack_trace`.
pub fn encode_stack_trace(frames: &[StackFrame]) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(frames)
}

pub fn decode_stack_trace(bytes: &[u8]) -> Result<Vec<StackFrame>, bincode::Error> {
    bincode::deserialize(bytes)
}

/// A server-side exception rebuilt locally, including its chain of causes.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCause {
    pub summary: String,
    pub frames: Vec<StackFrame>,
    pub cause: Option<Box<RemoteCause>>,
}

impl fmt::Display for RemoteCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)
    }
}

impl Error for RemoteCause {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
    }
}

/// The underlying service failure plus, when it could be rebuilt, the
/// server-side exception that caused it.
#[derive(Debug)]
pub struct RemoteFailure {
    pub error: ServiceError,
    pub origin: Option<RemoteCause>,
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl Error for RemoteFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.origin {
            Some(origin) => Some(origin),
            None => self.error.source(),
        }
    }
}

/// Default translator: keeps the service error and rebuilds the server's
/// exception chain from serialized stack traces on a best-effort basis.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteErrorTranslator;

impl RemoteErrorTranslator {
    /// Rebuild `exception` and its causes. Returns `None` when no stack trace
    /// was sent or it could not be decoded.
    pub fn reconstruct(exception: &ServerException) -> Option<RemoteCause> {
        let bytes = exception.stack_trace.as_ref()?;

        let frames = match decode_stack_trace(bytes) {
            Ok(frames) => frames,
            Err(e) => {
                warn!(error = %e, "could not decode remote stack trace");
                return None;
            }
        };

        let message = exception.message.as_deref().unwrap_or("");
        let summary = match &exception.error_type {
            Some(error_type) => format!("{error_type}: {message}"),
            None => message.to_string(),
        };

        Some(RemoteCause {
            summary,
            frames,
            cause: exception
                .cause
                .as_deref()
                .and_then(Self::reconstruct)
                .map(Box::new),
        })
    }
}

impl ErrorTranslator for RemoteErrorTranslator {
    fn translate(&self, error: ServiceError) -> CursorError {
        let (message, origin) = match &error {
            ServiceError::Remote(resp) => {
                let exception = resp.server_exception.as_ref();
                let origin = exception.and_then(Self::reconstruct);
                let message = match (&origin, exception) {
                    (Some(origin), _) => origin.summary.clone(),
                    (None, Some(e)) => e.message.clone().unwrap_or_default(),
                    (None, None) => String::new(),
                };
                (message, origin)
            }
            ServiceError::Transport(msg) => (msg.clone(), None),
        };

        CursorError::Remote {
            message,
            source: RemoteFailure { error, origin },
        }
    }
}

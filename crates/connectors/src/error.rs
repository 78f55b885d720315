use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failures raised by a [`QueryService`](crate::service::QueryService) call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service answered with a structured failure.
    #[error("Remote error: {0}")]
    Remote(#[from] ErrorResponse),

    /// The call never produced a response (connection dropped, peer gone, ...).
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ServiceError {
    /// The structured failure body, if the service sent one.
    pub fn response(&self) -> Option<&ErrorResponse> {
        match self {
            ServiceError::Remote(resp) => Some(resp),
            ServiceError::Transport(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonCode {
    Error,
    Cancelled,
    Timeout,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasonCode::Error => write!(f, "Error"),
            ReasonCode::Cancelled => write!(f, "Cancelled"),
            ReasonCode::Timeout => write!(f, "Timeout"),
        }
    }
}

/// Error reported by the server as part of a failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ReasonCode,
    pub server_exception: Option<ServerException>,
}

impl ErrorResponse {
    pub fn new(code: ReasonCode, server_exception: Option<ServerException>) -> Self {
        Self {
            code,
            server_exception,
        }
    }

    /// Shorthand for a plain `Error` response carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(
            ReasonCode::Error,
            Some(ServerException {
                message: Some(message.into()),
                ..Default::default()
            }),
        )
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self
            .server_exception
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .unwrap_or("");
        write!(f, "{}: {}", self.code, message)
    }
}

impl std::error::Error for ErrorResponse {}

/// Description of the exception that failed a request on the server side.
///
/// `stack_trace` is an opaque serialized call stack; see the engine's error
/// translator for the format it understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerException {
    pub error_type: Option<String>,
    pub message: Option<String>,
    pub stack_trace: Option<Vec<u8>>,
    pub cause: Option<Box<ServerException>>,
}

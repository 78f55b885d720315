use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Opaque identifier the remote service assigns to a submitted query.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryId(Arc<str>);

impl QueryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(Arc::from(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for QueryId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for QueryId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

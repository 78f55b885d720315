use std::{collections::HashMap, time::Duration};
use thiserror::Error;

/// Property key for the number of rows requested per page.
pub const BATCH_SIZE: &str = "batchSize";

/// Property key for the server-side timeout, in seconds. `0` disables it.
pub const TIMEOUT: &str = "timeout";

pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid value '{value}' for property '{key}': {reason}")]
    InvalidProperty {
        key: String,
        value: String,
        reason: String,
    },
}

/// Client-side view of the query properties the cursor itself acts on.
///
/// All properties are still forwarded to the server untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    /// Rows requested per page.
    pub max_page_size: usize,

    /// Timeout advertised to the server, `None` when disabled.
    pub timeout: Option<Duration>,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            timeout: None,
        }
    }
}

impl QuerySettings {
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        if let Some(raw) = properties.get(BATCH_SIZE) {
            settings.max_page_size = match raw.trim().parse::<usize>() {
                Ok(0) => return Err(invalid(BATCH_SIZE, raw, "must be at least 1")),
                Ok(size) => size,
                Err(e) => return Err(invalid(BATCH_SIZE, raw, &e.to_string())),
            };
        }

        if let Some(raw) = properties.get(TIMEOUT) {
            let seconds = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid(TIMEOUT, raw, &e.to_string()))?;
            settings.timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        }

        Ok(settings)
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidProperty {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

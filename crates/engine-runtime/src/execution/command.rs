use crate::execution::query::QueryExecution;
use connectors::service::QueryService;
use engine_core::{
    error::CursorError,
    settings::{BATCH_SIZE, TIMEOUT},
};
use std::{collections::HashMap, sync::Arc, time::Duration};

/// A query text plus the knobs a caller sets before running it.
#[derive(Debug, Clone, Default)]
pub struct QueryCommand {
    command: String,
    parameters: HashMap<String, String>,
    batch_size: Option<usize>,
    timeout: Option<Duration>,
}

impl QueryCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Rows requested per page. Left to the default when unset.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Server-side timeout, sent with whole-second precision.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Properties sent along with the query.
    pub fn properties(&self) -> HashMap<String, String> {
        let mut props = HashMap::new();
        if let Some(size) = self.batch_size {
            props.insert(BATCH_SIZE.to_string(), size.to_string());
        }
        let seconds = self.timeout.map_or(0, |t| t.as_secs());
        props.insert(TIMEOUT.to_string(), seconds.to_string());
        props
    }

    /// Run the command on a fresh execution, ready for cursoring.
    pub async fn execute_query(
        &self,
        service: Arc<dyn QueryService>,
    ) -> Result<QueryExecution, CursorError> {
        let execution = QueryExecution::new(service);
        execution
            .query(&self.command, self.parameters.clone(), self.properties())
            .await?;
        Ok(execution)
    }
}

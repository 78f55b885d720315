#![allow(dead_code)]

use engine_runtime::execution::QueryExecution;
use model::records::row::Row;

/// Cursor flags observed right after a successful `advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed {
    pub position: usize,
    pub is_first: bool,
    pub is_last: bool,
    pub row: Row,
}

/// Walk the cursor to the end, recording every visited row and its flags.
pub async fn drain(execution: &QueryExecution) -> Vec<Observed> {
    let mut seen = Vec::new();
    while execution.advance().await.expect("advance") {
        seen.push(Observed {
            position: execution.position().await,
            is_first: execution.is_first().await,
            is_last: execution.is_last().await,
            row: execution.current_row().await.expect("current row"),
        });
    }
    seen
}

/// Integer column of a row produced by `InMemoryQueryService::with_rows`.
pub fn row_number(row: &Row) -> i64 {
    row.get(1)
        .and_then(|v| v.as_i64())
        .expect("second column is an integer")
}

/// Number of `data` requests in a service message log.
pub fn data_requests(messages: &[String]) -> usize {
    messages
        .iter()
        .filter(|m| m.starts_with("Message=data"))
        .count()
}

#![allow(dead_code)]

use connectors::memory::InMemoryQueryService;
use engine_runtime::execution::{QueryCommand, QueryExecution};
use std::sync::Arc;

pub mod utils;

/// Query text sent by every scenario; the in-memory service ignores it.
const TEST_QUERY: &str = "SELECT ?a ?b WHERE { ?a <http://foobar.baz/p> ?b }";

/// Build a service holding `rows` two-column rows.
fn service(rows: usize) -> Arc<InMemoryQueryService> {
    Arc::new(InMemoryQueryService::with_rows(rows))
}

/// Submit the test query against `service`, paging by `batch_size`.
async fn start(service: Arc<InMemoryQueryService>, batch_size: Option<usize>) -> QueryExecution {
    let mut command = QueryCommand::new(TEST_QUERY);
    if let Some(size) = batch_size {
        command = command.with_batch_size(size);
    }
    command.execute_query(service).await.expect("submit query")
}

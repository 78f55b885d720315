use crate::{
    error::{ErrorResponse, ServiceError},
    requests::{
        CancelRequest, CloseRequest, CloseResponse, DataRequest, DataResponse, QueryRequest,
        QueryResponse,
    },
    service::QueryService,
};
use async_trait::async_trait;
use model::{core::identifiers::QueryId, core::value::Value, records::row::Row};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tracing::debug;

/// Number of columns in the generated result table.
pub const DEFAULT_WIDTH: usize = 2;

pub const OUT_OF_RANGE_MESSAGE: &str = "Invalid request for rows outside the result set.";

/// A [`QueryService`] answering every query with the same in-memory table.
///
/// Every received message is logged in arrival order so callers can assert
/// on the exact conversation, and concurrent `data` calls are counted.
pub struct InMemoryQueryService {
    vars: Vec<String>,
    data: Vec<Row>,
    delay: Option<Duration>,
    next_query_id: AtomicU64,
    messages: Mutex<Vec<String>>,
    data_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryQueryService {
    /// Generated table of `rows` rows: `[<http://foobar.baz/this/uri/N>, N]`.
    pub fn with_rows(rows: usize) -> Self {
        let vars = (0..DEFAULT_WIDTH)
            .map(|i| char::from(b'a' + i as u8).to_string())
            .collect();
        let data = (1..=rows)
            .map(|row| {
                vec![
                    Value::Iri(format!("http://foobar.baz/this/uri/{row}")),
                    Value::Int(row as i64),
                ]
            })
            .collect();
        Self::with_data(vars, data)
    }

    pub fn with_data(vars: Vec<String>, data: Vec<Row>) -> Self {
        Self {
            vars,
            data,
            delay: None,
            next_query_id: AtomicU64::new(1),
            messages: Mutex::new(Vec::new()),
            data_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Delay every `data` response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn rows(&self) -> &[Row] {
        &self.data
    }

    /// Snapshot of the messages received so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn data_calls(&self) -> usize {
        self.data_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `data` calls that were ever running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, message: String) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    fn page(&self, request: &DataRequest) -> Result<DataResponse, ServiceError> {
        let total = self.data.len();

        if total == 0 {
            return Ok(DataResponse {
                query_id: request.query_id.clone(),
                start_row: 1,
                data: Vec::new(),
                more: false,
            });
        }

        if request.start_row == 0 || request.start_row > total {
            return Err(ErrorResponse::message(OUT_OF_RANGE_MESSAGE).into());
        }

        let begin = request.start_row - 1;
        let end = begin.saturating_add(request.max_size).min(total);
        Ok(DataResponse {
            query_id: request.query_id.clone(),
            start_row: request.start_row,
            data: self.data[begin..end].to_vec(),
            more: end < total,
        })
    }
}

/// Decrements the in-flight counter when a `data` call finishes, however it
/// finishes.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn fmt_map(map: &HashMap<String, String>) -> String {
    let sorted: BTreeMap<_, _> = map.iter().collect();
    let body = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

#[async_trait]
impl QueryService for InMemoryQueryService {
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, ServiceError> {
        debug!(sparql = %request.sparql, "in-memory service got query request");
        self.record(format!(
            "Message=query sparql={} params={} props={} ",
            request.sparql,
            fmt_map(&request.parameters),
            fmt_map(&request.properties)
        ));

        let id = self.next_query_id.fetch_add(1, Ordering::SeqCst);
        Ok(QueryResponse {
            query_id: QueryId::new(id.to_string()),
            vars: self.vars.clone(),
        })
    }

    async fn data(&self, request: DataRequest) -> Result<DataResponse, ServiceError> {
        self.data_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        self.record(format!(
            "Message=data queryId={} startRow={} maxSize={} ",
            request.query_id, request.start_row, request.max_size
        ));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.page(&request)?;
        debug!(
            start_row = response.start_row,
            end_row = response.end_row(),
            more = response.more,
            "in-memory service sending page"
        );
        Ok(response)
    }

    async fn cancel(&self, request: CancelRequest) -> Result<CloseResponse, ServiceError> {
        self.record(format!("Message=cancel queryId={} ", request.query_id));
        Ok(CloseResponse {
            query_id: request.query_id,
        })
    }

    async fn close(&self, request: CloseRequest) -> Result<CloseResponse, ServiceError> {
        self.record(format!("Message=close queryId={} ", request.query_id));
        Ok(CloseResponse {
            query_id: request.query_id,
        })
    }
}

use crate::actor::{
    ActorContext, ActorRef, fetcher::PageFetcher, messages::FetchMsg, spawn::spawn_actor,
};
use connectors::{
    requests::{CancelRequest, CloseRequest, QueryRequest},
    service::QueryService,
};
use engine_core::{
    error::CursorError,
    metrics::{FetchMetrics, FetchMetricsSnapshot},
    page::Page,
    settings::QuerySettings,
    slot::HandoffSlot,
    translate::{ErrorTranslator, RemoteErrorTranslator},
};
use model::{core::identifiers::QueryId, records::row::Row};
use std::{
    collections::HashMap,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, trace};

// The fetcher handles one request at a time and the cursor only schedules the
// next one after consuming the previous result, so one slot is all it needs.
const FETCH_MAILBOX_CAPACITY: usize = 1;

/// Metadata fixed once the server accepted the query.
#[derive(Debug)]
struct ActiveQuery {
    id: QueryId,
    vars: Vec<String>,
    fetcher: ActorRef<FetchMsg>,
    worker: JoinHandle<()>,
}

#[derive(Debug)]
struct CursorState {
    settings: QuerySettings,
    // overall position, 1-based; 0 is before the first row
    row_index: usize,
    current: Page,
    finished: bool,
    failed: bool,
}

/// Forward-only cursor over the result of a single query.
///
/// Pages are requested from the service one step ahead of the reader by a
/// dedicated worker. An execution serves exactly one query and is not
/// reusable.
pub struct QueryExecution {
    service: Arc<dyn QueryService>,
    translator: Arc<dyn ErrorTranslator>,
    next_page: Arc<HandoffSlot<Page, CursorError>>,
    metrics: FetchMetrics,
    active: OnceLock<ActiveQuery>,
    closed: AtomicBool,
    state: Mutex<CursorState>,
}

impl QueryExecution {
    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self::with_translator(service, Arc::new(RemoteErrorTranslator))
    }

    pub fn with_translator(
        service: Arc<dyn QueryService>,
        translator: Arc<dyn ErrorTranslator>,
    ) -> Self {
        Self {
            service,
            translator,
            next_page: Arc::new(HandoffSlot::new()),
            metrics: FetchMetrics::new(),
            active: OnceLock::new(),
            closed: AtomicBool::new(false),
            state: Mutex::new(CursorState {
                settings: QuerySettings::default(),
                row_index: 0,
                current: Page::pending(),
                finished: false,
                failed: false,
            }),
        }
    }

    /// Submit the query and start prefetching its first page.
    ///
    /// Returns the ordered output variables. Nothing runs in the background
    /// if submission fails.
    pub async fn query(
        &self,
        command: &str,
        parameters: HashMap<String, String>,
        properties: HashMap<String, String>,
    ) -> Result<Vec<String>, CursorError> {
        let mut state = self.state.lock().await;
        if self.active.get().is_some() {
            return Err(CursorError::AlreadyStarted);
        }

        let settings = QuerySettings::from_properties(&properties)?;
        let request = QueryRequest {
            sparql: command.to_string(),
            parameters,
            properties,
        };

        debug!(
            max_page_size = settings.max_page_size,
            timeout_secs = ?settings.timeout.map(|t| t.as_secs()),
            "sending query request"
        );
        let response = self
            .service
            .query(request)
            .await
            .map_err(|e| self.translator.translate(e))?;
        debug!(query_id = %response.query_id, vars = ?response.vars, "received query response");

        let fetcher = PageFetcher::new(
            self.service.clone(),
            self.translator.clone(),
            self.next_page.clone(),
            self.metrics.clone(),
        );
        let ctx = ActorContext::new(
            format!("page-fetcher-{}", response.query_id),
            response.query_id.clone(),
        );
        let (fetcher, worker) = spawn_actor(ctx, FETCH_MAILBOX_CAPACITY, fetcher);

        let vars = response.vars.clone();
        let active = self.active.get_or_init(|| ActiveQuery {
            id: response.query_id,
            vars: response.vars,
            fetcher,
            worker,
        });

        *state = CursorState {
            settings,
            row_index: 0,
            current: Page::pending(),
            finished: false,
            failed: false,
        };
        self.schedule_fetch(active, &state, 1).await?;

        Ok(vars)
    }

    /// Move to the next row. Returns false once the result is exhausted.
    ///
    /// Suspends only when the current page is used up and the next one has
    /// not arrived yet. A failed background fetch is reported here, once.
    pub async fn advance(&self) -> Result<bool, CursorError> {
        let active = self.active()?;
        let mut state = self.state.lock().await;
        self.advance_locked(active, &mut state).await
    }

    /// Advance and return the new current row in one step.
    pub async fn next_row(&self) -> Result<Option<Row>, CursorError> {
        let active = self.active()?;
        let mut state = self.state.lock().await;
        if self.advance_locked(active, &mut state).await? {
            Ok(state.current.current().cloned())
        } else {
            Ok(None)
        }
    }

    async fn advance_locked(
        &self,
        active: &ActiveQuery,
        state: &mut CursorState,
    ) -> Result<bool, CursorError> {
        if state.failed {
            return Err(CursorError::Poisoned);
        }
        if state.finished {
            return Ok(false);
        }

        loop {
            if state.current.advance() {
                state.row_index += 1;
                return Ok(true);
            }

            let next = match self.next_page.poll() {
                Ok(Some(page)) => Ok(page),
                Ok(None) if !state.current.has_more() => {
                    trace!(row = state.row_index, "no current data, and all done");
                    state.row_index += 1;
                    state.finished = true;
                    return Ok(false);
                }
                Ok(None) if self.is_closed() => return Err(CursorError::Closed),
                Ok(None) => {
                    trace!(row = state.row_index, "waiting for next page");
                    self.next_page.take().await
                }
                Err(e) => Err(e),
            };

            let page = next.inspect_err(|_| state.failed = true)?;
            trace!(
                row = state.row_index,
                rows = page.len(),
                more = page.has_more(),
                "switching to next page"
            );

            let start_row = state.row_index + page.len() + 1;
            state.current = page;
            if let Err(e) = self.schedule_fetch(active, state, start_row).await {
                state.failed = true;
                return Err(e);
            }
        }
    }

    /// Ask the worker for the page starting at `start_row`, unless the current
    /// page is the last one or the cursor was closed.
    async fn schedule_fetch(
        &self,
        active: &ActiveQuery,
        state: &CursorState,
        start_row: usize,
    ) -> Result<(), CursorError> {
        if !state.current.has_more() || self.is_closed() {
            return Ok(());
        }

        trace!(
            fetcher = active.fetcher.name(),
            query_id = %active.fetcher.query_id(),
            start_row,
            "scheduling page request"
        );
        active
            .fetcher
            .send(FetchMsg::Fetch {
                start_row,
                max_rows: state.settings.max_page_size,
            })
            .await
            .map_err(|e| CursorError::WorkerInterrupted(e.to_string()))
    }

    /// The row the cursor is positioned on.
    pub async fn current_row(&self) -> Result<Row, CursorError> {
        self.active()?;
        let state = self.state.lock().await;
        state
            .current
            .current()
            .cloned()
            .ok_or(CursorError::NoCurrentRow)
    }

    /// Ask the server to cancel the query.
    ///
    /// Local state is untouched: a page already fetched, or still in flight,
    /// remains readable.
    pub async fn cancel(&self) -> Result<(), CursorError> {
        let active = self.active()?;
        debug!(query_id = %active.id, "cancelling query");
        self.service
            .cancel(CancelRequest {
                query_id: active.id.clone(),
            })
            .await
            .map_err(|e| self.translator.translate(e))?;
        Ok(())
    }

    /// Release the query on the server.
    ///
    /// No further pages are requested afterwards. Rows already buffered can
    /// still be read; once they run out `advance` fails with
    /// [`CursorError::Closed`].
    pub async fn close(&self) -> Result<(), CursorError> {
        let active = self.active()?;
        self.closed.store(true, Ordering::SeqCst);
        debug!(query_id = %active.id, "closing query");
        self.service
            .close(CloseRequest {
                query_id: active.id.clone(),
            })
            .await
            .map_err(|e| self.translator.translate(e))?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Output variables in column order; empty before `query`.
    pub fn variables(&self) -> Vec<String> {
        self.active
            .get()
            .map(|a| a.vars.clone())
            .unwrap_or_default()
    }

    pub fn query_id(&self) -> Option<QueryId> {
        self.active.get().map(|a| a.id.clone())
    }

    pub fn metrics(&self) -> FetchMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 1-based position of the current row. 0 before the first row and
    /// `total + 1` once the result is exhausted.
    pub async fn position(&self) -> usize {
        self.state.lock().await.row_index
    }

    pub async fn is_before_first(&self) -> bool {
        self.state.lock().await.row_index == 0
    }

    pub async fn is_first(&self) -> bool {
        let state = self.state.lock().await;
        state.row_index == 1 && state.current.is_valid()
    }

    /// True on the final row of the result.
    pub async fn is_last(&self) -> bool {
        let state = self.state.lock().await;
        state.current.is_valid() && !state.current.has_next()
    }

    pub async fn is_after_last(&self) -> bool {
        let state = self.state.lock().await;
        !(state.current.is_valid() || state.current.has_next())
    }

    fn active(&self) -> Result<&ActiveQuery, CursorError> {
        self.active.get().ok_or(CursorError::NotStarted)
    }
}

impl Drop for QueryExecution {
    fn drop(&mut self) {
        // a pending page request has nobody left to deliver to
        if let Some(active) = self.active.get() {
            active.worker.abort();
        }
    }
}

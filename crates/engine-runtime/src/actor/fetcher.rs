use crate::{
    actor::{Actor, ActorContext, messages::FetchMsg},
    error::ActorError,
};
use async_trait::async_trait;
use connectors::{requests::DataRequest, service::QueryService};
use engine_core::{
    error::CursorError, metrics::FetchMetrics, page::Page, slot::HandoffSlot,
    translate::ErrorTranslator,
};
use futures::FutureExt;
use model::records::row::row_size_bytes;
use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};
use tracing::{debug, error};

/// Background worker that requests pages for one query execution.
///
/// It never touches cursor state: every outcome, page or failure, is written
/// into the shared slot for the cursor to pick up.
pub struct PageFetcher {
    service: Arc<dyn QueryService>,
    translator: Arc<dyn ErrorTranslator>,
    slot: Arc<HandoffSlot<Page, CursorError>>,
    metrics: FetchMetrics,
}

impl PageFetcher {
    pub fn new(
        service: Arc<dyn QueryService>,
        translator: Arc<dyn ErrorTranslator>,
        slot: Arc<HandoffSlot<Page, CursorError>>,
        metrics: FetchMetrics,
    ) -> Self {
        Self {
            service,
            translator,
            slot,
            metrics,
        }
    }

    async fn fetch(
        &self,
        ctx: &ActorContext,
        start_row: usize,
        max_rows: usize,
    ) -> Result<Fetched, CursorError> {
        debug!(
            actor = ctx.name(),
            query_id = %ctx.query_id(),
            start_row,
            end_row = start_row.saturating_add(max_rows).saturating_sub(1),
            "requesting page"
        );

        let request = DataRequest {
            query_id: ctx.query_id().clone(),
            start_row,
            max_size: max_rows,
        };

        match self.service.data(request).await {
            Ok(response) => {
                debug!(
                    actor = ctx.name(),
                    start_row = response.start_row,
                    end_row = response.end_row(),
                    more = response.more,
                    "received page"
                );
                let rows = response.data.len() as u64;
                let bytes: usize = response
                    .data
                    .iter()
                    .map(Vec::as_slice)
                    .map(row_size_bytes)
                    .sum();
                Ok(Fetched {
                    page: Page::new(response.data, response.more),
                    rows,
                    bytes: bytes as u64,
                })
            }
            Err(e) => {
                debug!(actor = ctx.name(), start_row, error = %e, "page request failed");
                Err(self.translator.translate(e))
            }
        }
    }

    /// Run one fetch and hand its outcome to the cursor. A panic anywhere in
    /// the fetch is delivered as [`CursorError::WorkerInterrupted`].
    async fn fetch_into_slot(&self, ctx: &ActorContext, start_row: usize, max_rows: usize) {
        let mut pending = PendingDelivery {
            slot: &self.slot,
            delivered: false,
        };

        let outcome = AssertUnwindSafe(self.fetch(ctx, start_row, max_rows))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let reason = panic_reason(panic.as_ref());
                error!(actor = ctx.name(), start_row, %reason, "page request panicked");
                Err(CursorError::WorkerInterrupted(reason))
            });

        pending.delivered = true;
        match outcome {
            Ok(fetched) => {
                self.slot.put(fetched.page);
                self.metrics.record_page(fetched.rows, fetched.bytes);
            }
            Err(e) => {
                self.metrics.record_failure();
                self.slot.put_error(e);
            }
        }
    }
}

/// A page plus the counters recorded once it is handed over.
struct Fetched {
    page: Page,
    rows: u64,
    bytes: u64,
}

/// Reports an interruption if the fetch is dropped before it delivered,
/// e.g. when the worker task is aborted mid-request.
struct PendingDelivery<'a> {
    slot: &'a HandoffSlot<Page, CursorError>,
    delivered: bool,
}

impl Drop for PendingDelivery<'_> {
    fn drop(&mut self) {
        if !self.delivered {
            self.slot.put_error(CursorError::WorkerInterrupted(
                "page fetcher stopped before delivering a page".to_string(),
            ));
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "page request panicked".to_string()
    }
}

#[async_trait]
impl Actor<FetchMsg> for PageFetcher {
    async fn handle(&mut self, msg: FetchMsg, ctx: &ActorContext) -> Result<(), ActorError> {
        match msg {
            FetchMsg::Fetch {
                start_row,
                max_rows,
            } => self.fetch_into_slot(ctx, start_row, max_rows).await,
        }
        Ok(())
    }

    async fn on_stop(&mut self, ctx: &ActorContext) -> Result<(), ActorError> {
        debug!(actor = ctx.name(), "page fetcher stopping");
        Ok(())
    }
}

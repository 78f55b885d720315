#[cfg(test)]
mod tests {
    use crate::execution::{QueryCommand, QueryExecution};
    use async_trait::async_trait;
    use connectors::{
        error::{ErrorResponse, ReasonCode, ServiceError},
        memory::InMemoryQueryService,
        requests::{
            CancelRequest, CloseRequest, CloseResponse, DataRequest, DataResponse, QueryRequest,
            QueryResponse,
        },
        service::QueryService,
    };
    use engine_core::error::CursorError;
    use futures::TryStreamExt;
    use std::{collections::HashMap, sync::Arc, time::Duration};
    use tokio::sync::Semaphore;

    /// Delegates to an in-memory table, optionally failing or panicking on
    /// `data`, and optionally holding every `data` call until a permit is
    /// released.
    struct MockService {
        inner: InMemoryQueryService,
        fail_query: bool,
        fail_data_from: Option<usize>,
        panic_on_data: bool,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockService {
        fn new(rows: usize) -> Self {
            Self {
                inner: InMemoryQueryService::with_rows(rows),
                fail_query: false,
                fail_data_from: None,
                panic_on_data: false,
                gate: None,
            }
        }

        fn gated(rows: usize) -> (Self, Arc<Semaphore>) {
            let gate = Arc::new(Semaphore::new(0));
            let mut service = Self::new(rows);
            service.gate = Some(gate.clone());
            (service, gate)
        }
    }

    #[async_trait]
    impl QueryService for MockService {
        async fn query(&self, request: QueryRequest) -> Result<QueryResponse, ServiceError> {
            if self.fail_query {
                return Err(ErrorResponse::message("foo").into());
            }
            self.inner.query(request).await
        }

        async fn data(&self, request: DataRequest) -> Result<DataResponse, ServiceError> {
            if let Some(gate) = &self.gate {
                gate.acquire()
                    .await
                    .map_err(|e| ServiceError::Transport(e.to_string()))?
                    .forget();
            }
            if self.panic_on_data {
                panic!("data source exploded");
            }
            if self.fail_data_from.is_some_and(|from| request.start_row >= from) {
                return Err(ErrorResponse::message("foo").into());
            }
            self.inner.data(request).await
        }

        async fn cancel(&self, request: CancelRequest) -> Result<CloseResponse, ServiceError> {
            self.inner.cancel(request).await
        }

        async fn close(&self, request: CloseRequest) -> Result<CloseResponse, ServiceError> {
            self.inner.close(request).await
        }
    }

    fn batch(size: usize) -> HashMap<String, String> {
        HashMap::from([("batchSize".to_string(), size.to_string())])
    }

    async fn wait_for_pages(execution: &QueryExecution, pages: u64) {
        while execution.metrics().pages_fetched < pages {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn remote_message(err: &CursorError) -> Option<String> {
        err.remote()?
            .error
            .response()?
            .server_exception
            .as_ref()?
            .message
            .clone()
    }

    #[tokio::test]
    async fn test_query_sends_first_page_request() {
        let service = Arc::new(MockService::new(20));
        let execution = QueryExecution::new(service.clone());

        let vars = execution
            .query("SELECT foo", HashMap::new(), batch(10))
            .await
            .unwrap();
        assert_eq!(vars, vec!["a", "b"]);
        assert_eq!(execution.variables(), vars);
        assert_eq!(execution.query_id().unwrap().as_str(), "1");
        assert_eq!(execution.position().await, 0);

        // blocks until the first page is in, so the first request happened
        assert!(execution.advance().await.unwrap());
        assert_eq!(execution.position().await, 1);

        let messages = service.inner.messages();
        assert!(messages.len() >= 2);
        assert_eq!(
            messages[0],
            "Message=query sparql=SELECT foo params={} props={batchSize=10} "
        );
        assert_eq!(messages[1], "Message=data queryId=1 startRow=1 maxSize=10 ");
    }

    #[tokio::test]
    async fn test_params_and_props_transferred_through() {
        let service = Arc::new(MockService::new(10));
        let execution = QueryExecution::new(service.clone());

        let params = HashMap::from([("abc".to_string(), "def".to_string())]);
        let props = HashMap::from([("ghi".to_string(), "jkl".to_string())]);
        execution.query("SELECT foo", params, props).await.unwrap();

        assert_eq!(
            service.inner.messages()[0],
            "Message=query sparql=SELECT foo params={abc=def} props={ghi=jkl} "
        );
    }

    #[tokio::test]
    async fn test_exception_on_query() {
        let mut service = MockService::new(20);
        service.fail_query = true;
        let service = Arc::new(service);
        let execution = QueryExecution::new(service.clone());

        let err = execution
            .query("SELECT foo", HashMap::new(), HashMap::new())
            .await
            .unwrap_err();

        let resp = err.remote().unwrap().error.response().unwrap();
        assert_eq!(resp.code, ReasonCode::Error);
        assert_eq!(remote_message(&err).as_deref(), Some("foo"));
        assert_eq!(err.to_string(), "Remote Exception: foo");

        // nothing started in the background
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(service.inner.data_calls(), 0);
        assert!(execution.variables().is_empty());
        assert!(matches!(
            execution.advance().await,
            Err(CursorError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn test_exception_on_data() {
        let mut service = MockService::new(20);
        service.fail_data_from = Some(1);
        let execution = QueryExecution::new(Arc::new(service));
        execution
            .query("SELECT foo", HashMap::new(), HashMap::new())
            .await
            .unwrap();

        let err = execution.advance().await.unwrap_err();
        assert_eq!(remote_message(&err).as_deref(), Some("foo"));
        assert_eq!(execution.position().await, 0);
        assert_eq!(execution.metrics().fetch_failures, 1);

        // the failure is reported once; the cursor refuses to go on
        assert!(matches!(
            execution.advance().await,
            Err(CursorError::Poisoned)
        ));
    }

    #[tokio::test]
    async fn test_failure_surfaces_where_it_occurs_in_row_sequence() {
        let mut service = MockService::new(20);
        service.fail_data_from = Some(11);
        let execution = QueryExecution::new(Arc::new(service));
        execution
            .query("SELECT foo", HashMap::new(), batch(10))
            .await
            .unwrap();

        for expected in 1..=10 {
            assert!(execution.advance().await.unwrap());
            assert_eq!(execution.position().await, expected);
        }
        let err = execution.advance().await.unwrap_err();
        assert_eq!(remote_message(&err).as_deref(), Some("foo"));
        assert_eq!(execution.position().await, 10);
    }

    #[tokio::test]
    async fn test_worker_panic_is_delivered_as_interruption() {
        let mut service = MockService::new(5);
        service.panic_on_data = true;
        let execution = QueryExecution::new(Arc::new(service));
        execution
            .query("SELECT foo", HashMap::new(), HashMap::new())
            .await
            .unwrap();

        match execution.advance().await {
            Err(CursorError::WorkerInterrupted(reason)) => {
                assert_eq!(reason, "data source exploded")
            }
            other => panic!("expected interruption, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lifecycle_misuse() {
        let service = Arc::new(MockService::new(3));
        let execution = QueryExecution::new(service.clone());

        assert!(matches!(execution.advance().await, Err(CursorError::NotStarted)));
        assert!(matches!(execution.current_row().await, Err(CursorError::NotStarted)));
        assert!(matches!(execution.cancel().await, Err(CursorError::NotStarted)));
        assert!(matches!(execution.close().await, Err(CursorError::NotStarted)));
        assert!(execution.is_before_first().await);
        assert!(!execution.is_after_last().await);
        assert!(execution.query_id().is_none());

        execution
            .query("SELECT foo", HashMap::new(), HashMap::new())
            .await
            .unwrap();
        assert!(matches!(
            execution.current_row().await,
            Err(CursorError::NoCurrentRow)
        ));
        assert!(matches!(
            execution
                .query("SELECT bar", HashMap::new(), HashMap::new())
                .await,
            Err(CursorError::AlreadyStarted)
        ));
        // only the first query reached the server
        let queries = service
            .inner
            .messages()
            .iter()
            .filter(|m| m.starts_with("Message=query"))
            .count();
        assert_eq!(queries, 1);
    }

    #[tokio::test]
    async fn test_invalid_batch_size_is_rejected_before_submission() {
        let service = Arc::new(MockService::new(3));
        let execution = QueryExecution::new(service.clone());

        let err = execution
            .query("SELECT foo", HashMap::new(), batch(0))
            .await
            .unwrap_err();
        assert!(matches!(err, CursorError::Settings(_)));
        assert!(service.inner.messages().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_serves_buffered_rows_then_reports_closed() {
        let (service, gate) = MockService::gated(10);
        let service = Arc::new(service);
        let execution = QueryExecution::new(service.clone());
        execution
            .query("SELECT foo", HashMap::new(), batch(5))
            .await
            .unwrap();

        // first page only; the request for row 6 stays parked at the gate
        gate.add_permits(1);
        for _ in 1..=5 {
            assert!(execution.advance().await.unwrap());
        }

        execution.close().await.unwrap();
        assert!(execution.is_closed());
        assert!(matches!(execution.advance().await, Err(CursorError::Closed)));
        assert_eq!(execution.position().await, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_keeps_already_delivered_page() {
        let (service, gate) = MockService::gated(10);
        let service = Arc::new(service);
        let execution = QueryExecution::new(service.clone());
        execution
            .query("SELECT foo", HashMap::new(), batch(5))
            .await
            .unwrap();

        gate.add_permits(2);
        assert!(execution.advance().await.unwrap());
        wait_for_pages(&execution, 2).await;

        execution.close().await.unwrap();
        for expected in 2..=10 {
            assert!(execution.advance().await.unwrap());
            assert_eq!(execution.position().await, expected);
        }
        assert!(!execution.advance().await.unwrap());
        assert!(execution.is_after_last().await);
        assert_eq!(service.inner.data_calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_while_advance_is_waiting() {
        let (service, gate) = MockService::gated(3);
        let service = Arc::new(service);
        let execution = Arc::new(QueryExecution::new(service.clone()));
        execution
            .query("SELECT foo", HashMap::new(), HashMap::new())
            .await
            .unwrap();

        let reader = {
            let execution = execution.clone();
            tokio::spawn(async move { execution.advance().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!reader.is_finished());

        // cancel does not wait for the parked reader
        execution.cancel().await.unwrap();
        assert!(
            service
                .inner
                .messages()
                .contains(&"Message=cancel queryId=1 ".to_string())
        );

        // weak cancellation: the in-flight page still arrives and is served
        gate.add_permits(1);
        assert!(reader.await.unwrap().unwrap());
        assert_eq!(execution.position().await, 1);
    }

    #[tokio::test]
    async fn test_rows_stream_yields_every_row() {
        let service = Arc::new(MockService::new(11));
        let execution = QueryCommand::new("SELECT foo")
            .with_batch_size(5)
            .execute_query(service.clone())
            .await
            .unwrap();

        let rows: Vec<_> = execution.rows().try_collect().await.unwrap();
        assert_eq!(rows, service.inner.rows());
        assert!(execution.is_after_last().await);
        assert_eq!(execution.position().await, 12);
    }

    #[tokio::test]
    async fn test_rows_stream_ends_after_first_error() {
        let mut service = MockService::new(8);
        service.fail_data_from = Some(6);
        let execution = QueryCommand::new("SELECT foo")
            .with_batch_size(5)
            .execute_query(Arc::new(service))
            .await
            .unwrap();

        let results: Vec<_> = futures::StreamExt::collect::<Vec<_>>(execution.rows()).await;
        assert_eq!(results.len(), 6);
        assert!(results[..5].iter().all(Result::is_ok));
        assert!(results[5].is_err());
    }
}

use crate::{
    error::ServiceError,
    requests::{
        CancelRequest, CloseRequest, CloseResponse, DataRequest, DataResponse, QueryRequest,
        QueryResponse,
    },
};
use async_trait::async_trait;

/// The remote query service a cursor reads from.
///
/// Every call either completes with a typed response or fails with a
/// [`ServiceError`]. Implementations own their transport; the cursor engine
/// only sequences the calls.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Open a server-side query and report its id and output variables.
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, ServiceError>;

    /// Fetch one page of rows.
    async fn data(&self, request: DataRequest) -> Result<DataResponse, ServiceError>;

    async fn cancel(&self, request: CancelRequest) -> Result<CloseResponse, ServiceError>;

    async fn close(&self, request: CloseRequest) -> Result<CloseResponse, ServiceError>;
}

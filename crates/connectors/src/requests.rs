use model::{core::identifiers::QueryId, records::row::Row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Submits a query for execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub sparql: String,
    pub parameters: HashMap<String, String>,
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub query_id: QueryId,
    pub vars: Vec<String>,
}

/// Asks for up to `max_size` rows starting at the 1-based `start_row`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRequest {
    pub query_id: QueryId,
    pub start_row: usize,
    pub max_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub query_id: QueryId,
    /// First row actually served; the server may clamp the requested start.
    pub start_row: usize,
    pub data: Vec<Row>,
    /// Whether the server holds rows beyond this batch.
    pub more: bool,
}

impl DataResponse {
    /// Last row number contained in this response.
    pub fn end_row(&self) -> usize {
        (self.start_row + self.data.len()).saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub query_id: QueryId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseRequest {
    pub query_id: QueryId,
}

/// Acknowledgement for both cancel and close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseResponse {
    pub query_id: QueryId,
}

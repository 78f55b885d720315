use crate::core::value::Value;

/// A single result tuple. Width is fixed for the lifetime of a query and
/// matches the number of variables the query reported.
pub type Row = Vec<Value>;

/// Total payload size of a row, used for logging page volume.
pub fn row_size_bytes(row: &[Value]) -> usize {
    row.iter().map(Value::size_bytes).sum()
}

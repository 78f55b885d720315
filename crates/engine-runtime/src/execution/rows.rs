use crate::execution::query::QueryExecution;
use engine_core::error::CursorError;
use futures::{Stream, stream};
use model::records::row::Row;

impl QueryExecution {
    /// Stream the remaining rows of the result.
    ///
    /// The stream ends when the cursor walks off the last row, or right after
    /// yielding the first error.
    pub fn rows(&self) -> impl Stream<Item = Result<Row, CursorError>> + Send + '_ {
        stream::try_unfold(self, |execution| async move {
            let row = execution.next_row().await?;
            Ok::<_, CursorError>(row.map(|row| (row, execution)))
        })
    }
}

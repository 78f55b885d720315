/// Messages for the page fetcher actor.
#[derive(Debug)]
pub enum FetchMsg {
    /// Request up to `max_rows` rows starting at the 1-based `start_row`
    /// and deliver the outcome into the handoff slot.
    Fetch { start_row: usize, max_rows: usize },
}

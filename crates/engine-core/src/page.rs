use model::records::row::Row;

/// One server-delivered batch of rows, read once from left to right.
#[derive(Debug, Clone)]
pub struct Page {
    rows: Vec<Row>,
    more: bool,
    // None until the first advance; never moves backwards and is clamped to
    // `rows.len()` once the page is exhausted.
    position: Option<usize>,
}

impl Page {
    pub fn new(rows: Vec<Row>, more: bool) -> Self {
        Self {
            rows,
            more,
            position: None,
        }
    }

    /// Placeholder installed before the first page arrives: no rows, more to come.
    pub fn pending() -> Self {
        Self::new(Vec::new(), true)
    }

    /// Move to the next row. Returns false once every row has been read.
    pub fn advance(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            true
        } else {
            self.position = Some(self.rows.len());
            false
        }
    }

    /// The row under the read position, if it points at one.
    pub fn current(&self) -> Option<&Row> {
        self.position.and_then(|p| self.rows.get(p))
    }

    pub fn is_valid(&self) -> bool {
        self.current().is_some()
    }

    /// True if another row exists after the current one, here or on the server.
    pub fn has_next(&self) -> bool {
        if self.more {
            return true;
        }
        match self.position {
            None => !self.rows.is_empty(),
            Some(p) => p + 1 < self.rows.len(),
        }
    }

    /// Whether the server reported rows beyond this page.
    pub fn has_more(&self) -> bool {
        self.more
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

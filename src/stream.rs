use std::collections::VecDeque;

use crate::error::Result;
use crate::fetcher::PageFetcher;
use crate::iterator::PagedViewIterator;
use crate::observer::PageObserver;
use crate::row::RowIdentity;

/// Row-at-a-time view over a pager.
///
/// Buffers one page and pulls the next only when the buffer runs dry, so at
/// most one page of rows is held at a time.
pub struct RowStream<R: RowIdentity, F, O> {
    pages: PagedViewIterator<R, F, O>,
    rows: VecDeque<R>,
    done: bool,
}

impl<R, F, O> RowStream<R, F, O>
where
    R: RowIdentity,
    R::Key: std::fmt::Debug,
    F: PageFetcher<R>,
    O: PageObserver<R::Key>,
{
    pub fn new(pages: PagedViewIterator<R, F, O>) -> Self {
        Self {
            pages,
            rows: VecDeque::new(),
            done: false,
        }
    }

    /// The underlying pager, e.g. to check `termination()` once drained.
    pub fn pages(&self) -> &PagedViewIterator<R, F, O> {
        &self.pages
    }

    /// Pop the next row, fetching pages as needed. `None` once exhausted.
    pub fn next_row(&mut self) -> Option<Result<R>> {
        loop {
            if self.done {
                return None;
            }
            if let Some(row) = self.rows.pop_front() {
                return Some(Ok(row));
            }
            if !self.pages.has_next() {
                self.done = true;
                return None;
            }
            match self.pages.next_page() {
                // Empty pages just loop around to the exhaustion check
                Ok(page) => self.rows.extend(page.into_rows()),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<R, F, O> Iterator for RowStream<R, F, O>
where
    R: RowIdentity,
    R::Key: std::fmt::Debug,
    F: PageFetcher<R>,
    O: PageObserver<R::Key>,
{
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }
}

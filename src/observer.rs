use std::fmt::Debug;

use crate::collate::ViewKey;
use crate::row::{describe, RowReference};

/// What one fetch returned, before trimming. Kept by the pager in place of
/// the response itself so no rows are retained after they are handed out.
#[derive(Debug, Clone)]
pub struct PageStats<K> {
    /// Cursor the page was requested with.
    pub cursor: Option<RowReference<K>>,
    /// Rows returned by the fetcher, lookahead row included.
    pub fetched_rows: usize,
    /// Rows handed to the caller.
    pub returned_rows: usize,
    pub offset: Option<u64>,
    pub total_rows: Option<u64>,
    pub reduced: bool,
}

/// Pagination stopped because the trailing row of a page was the row the page
/// started at. Rows after that point were never fetched.
#[derive(Debug, Clone)]
pub struct StallEvent<K> {
    pub cursor: RowReference<K>,
    pub offset: Option<u64>,
    pub total_rows: Option<u64>,
    /// Rows the index still holds past the returned page, when counts are known.
    pub unfetched_rows: Option<u64>,
}

impl<K: ViewKey> PartialEq for PageStats<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cursor == other.cursor
            && self.fetched_rows == other.fetched_rows
            && self.returned_rows == other.returned_rows
            && self.offset == other.offset
            && self.total_rows == other.total_rows
            && self.reduced == other.reduced
    }
}

impl<K: ViewKey> PartialEq for StallEvent<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cursor == other.cursor
            && self.offset == other.offset
            && self.total_rows == other.total_rows
            && self.unfetched_rows == other.unfetched_rows
    }
}

/// Diagnostics sink for a pager.
pub trait PageObserver<K> {
    fn page_fetched(&mut self, _stats: &PageStats<K>) {}

    fn pagination_stalled(&mut self, _event: &StallEvent<K>) {}
}

/// Emits `tracing` events: one `debug` per page, a `warn` on stall.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl<K: Debug> PageObserver<K> for TracingObserver {
    fn page_fetched(&mut self, stats: &PageStats<K>) {
        tracing::debug!(
            total_rows = ?stats.total_rows,
            offset = ?stats.offset,
            rows = stats.fetched_rows,
            reduced = stats.reduced,
            cursor = %describe(stats.cursor.as_ref()),
            "got view page"
        );
    }

    fn pagination_stalled(&mut self, event: &StallEvent<K>) {
        tracing::warn!(
            cursor = %event.cursor,
            offset = ?event.offset,
            unfetched_rows = ?event.unfetched_rows,
            "cursor did not advance, stopping pagination"
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl<K> PageObserver<K> for NoopObserver {}

/// Adapts a closure into an observer that only cares about stalls.
pub struct OnStall<F>(pub F);

impl<K, F: FnMut(&StallEvent<K>)> PageObserver<K> for OnStall<F> {
    fn pagination_stalled(&mut self, event: &StallEvent<K>) {
        (self.0)(event)
    }
}

use crate::error::{Error, Result};
use crate::fetcher::PageFetcher;
use crate::observer::{PageObserver, PageStats, StallEvent, TracingObserver};
use crate::response::ViewQueryResponse;
use crate::row::{describe, RowIdentity, RowReference};
use crate::stream::RowStream;

/// Why a pager stopped handing out pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The last page came back with no more than `page_size` rows.
    Completed,
    /// The cursor stopped advancing; rows past it may never have been fetched.
    Stalled,
}

// ── Cursor state ─────────────────────────────────────────────

struct CursorState<K> {
    /// Where the next page starts. `None` before the first fetch and after
    /// the last one.
    cursor: Option<RowReference<K>>,
    attempted: bool,
    last_page: Option<PageStats<K>>,
    stall: Option<StallEvent<K>>,
}

impl<K> CursorState<K> {
    fn new() -> Self {
        Self {
            cursor: None,
            attempted: false,
            last_page: None,
            stall: None,
        }
    }
}

// ── Paged view iterator ──────────────────────────────────────

/// Walks a view page by page using `startkey`/`startkey_docid` pagination.
///
/// Each page is requested with `page_size + 1` rows. If the extra row comes
/// back, it is removed from the page and becomes the start of the next
/// request; otherwise the page is the last one.
///
/// Single-owner and pull-based: nothing is fetched until `next_page` is
/// called, and each call performs exactly one fetch.
pub struct PagedViewIterator<R: RowIdentity, F, O = TracingObserver> {
    page_size: usize,
    fetcher: F,
    observer: O,
    state: CursorState<R::Key>,
    fused: bool,
}

impl<R, F> PagedViewIterator<R, F>
where
    R: RowIdentity,
    R::Key: std::fmt::Debug,
    F: PageFetcher<R>,
{
    pub fn new(page_size: usize, fetcher: F) -> Result<Self> {
        Self::with_observer(page_size, fetcher, TracingObserver)
    }
}

impl<R, F, O> PagedViewIterator<R, F, O>
where
    R: RowIdentity,
    R::Key: std::fmt::Debug,
    F: PageFetcher<R>,
    O: PageObserver<R::Key>,
{
    pub fn with_observer(page_size: usize, fetcher: F, observer: O) -> Result<Self> {
        if page_size == 0 || page_size.checked_add(1).is_none() {
            return Err(Error::InvalidPageSize(page_size));
        }
        Ok(Self {
            page_size,
            fetcher,
            observer,
            state: CursorState::new(),
            fused: false,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// True until the first fetch; afterwards true while a cursor is held.
    pub fn has_next(&self) -> bool {
        !self.state.attempted || self.state.cursor.is_some()
    }

    /// Fetch and return the next page.
    ///
    /// Fetch failures propagate as they are and leave the cursor where it was.
    /// That is a fail-fast signal, not a resume point: build a new iterator to
    /// retry from scratch.
    pub fn next_page(&mut self) -> Result<ViewQueryResponse<R>> {
        if !self.has_next() {
            return Err(Error::Exhausted);
        }
        self.fetch()
    }

    /// The cursor the next page will start at.
    pub fn cursor(&self) -> Option<&RowReference<R::Key>> {
        self.state.cursor.as_ref()
    }

    /// Counts from the most recent page.
    pub fn last_page(&self) -> Option<&PageStats<R::Key>> {
        self.state.last_page.as_ref()
    }

    /// Set when pagination was cut short by a non-advancing cursor.
    pub fn stall(&self) -> Option<&StallEvent<R::Key>> {
        self.state.stall.as_ref()
    }

    pub fn termination(&self) -> Option<Termination> {
        if self.has_next() {
            None
        } else if self.state.stall.is_some() {
            Some(Termination::Stalled)
        } else {
            Some(Termination::Completed)
        }
    }

    /// Flatten into a row-at-a-time stream.
    pub fn into_rows(self) -> RowStream<R, F, O> {
        RowStream::new(self)
    }

    fn fetch(&mut self) -> Result<ViewQueryResponse<R>> {
        let limit = self.page_size + 1;
        let previous = self.state.cursor.take();

        let fetched = match self.fetcher.fetch_page(previous.as_ref(), limit) {
            Ok(Some(resp)) if resp.has_rows() => resp,
            Ok(_) => {
                let msg = format!(
                    "failed to fetch more rows. nextPage({})",
                    describe(previous.as_ref())
                );
                self.state.cursor = previous;
                return Err(Error::Fetch(msg));
            }
            Err(e) => {
                self.state.cursor = previous;
                return Err(e);
            }
        };

        let fetched_rows = fetched.row_count();
        if fetched_rows > limit {
            let msg = format!(
                "fetcher returned {fetched_rows} rows for a limit of {limit}. nextPage({})",
                describe(previous.as_ref())
            );
            self.state.cursor = previous;
            return Err(Error::Fetch(msg));
        }

        self.state.attempted = true;
        let mut page = fetched;

        let next = if fetched_rows <= self.page_size {
            None
        } else {
            // The lookahead row only tells us where the next page starts
            page.rows_mut()
                .and_then(Vec::pop)
                .map(|trailing| trailing.row_reference())
        };

        let stats = PageStats {
            cursor: previous.clone(),
            fetched_rows,
            returned_rows: page.row_count(),
            offset: page.offset(),
            total_rows: page.total_rows(),
            reduced: page.is_reduced(),
        };
        self.observer.page_fetched(&stats);

        self.state.cursor = match (next, previous) {
            (Some(next), Some(previous)) if next == previous => {
                let event = StallEvent {
                    offset: page.offset(),
                    total_rows: page.total_rows(),
                    unfetched_rows: page.remaining_rows(),
                    cursor: next,
                };
                self.observer.pagination_stalled(&event);
                self.state.stall = Some(event);
                None
            }
            (next, _) => next,
        };
        self.state.last_page = Some(stats);

        Ok(page)
    }
}

/// Yields pages until exhausted. After an error the iterator is fused, so
/// `collect::<Result<Vec<_>>>()` and `for` loops terminate.
impl<R, F, O> Iterator for PagedViewIterator<R, F, O>
where
    R: RowIdentity,
    R::Key: std::fmt::Debug,
    F: PageFetcher<R>,
    O: PageObserver<R::Key>,
{
    type Item = Result<ViewQueryResponse<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused || !self.has_next() {
            return None;
        }
        let result = self.next_page();
        if result.is_err() {
            self.fused = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{NoopObserver, OnStall};
    use crate::row::{ReducedRow, ViewRow};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Row = ViewRow<String>;

    fn row(key: &str) -> Row {
        ViewRow {
            id: format!("doc-{key}"),
            key: key.to_string(),
            value: serde_json::Value::Null,
            doc: None,
        }
    }

    /// Serves a sorted row set the way CouchDB does: `startkey` plus
    /// `startkey_docid` is inclusive, `limit` caps the rows.
    struct FakeView {
        rows: Vec<Row>,
        requests: Vec<(Option<RowReference<String>>, usize)>,
    }

    impl FakeView {
        fn new(keys: &[&str]) -> Self {
            Self {
                rows: keys.iter().map(|k| row(k)).collect(),
                requests: Vec::new(),
            }
        }
    }

    impl PageFetcher<Row> for FakeView {
        fn fetch_page(
            &mut self,
            cursor: Option<&RowReference<String>>,
            limit: usize,
        ) -> Result<Option<ViewQueryResponse<Row>>> {
            self.requests.push((cursor.cloned(), limit));
            let start = match cursor {
                None => 0,
                Some(c) => self
                    .rows
                    .iter()
                    .position(|r| r.row_reference() >= *c)
                    .unwrap_or(self.rows.len()),
            };
            let rows: Vec<Row> = self.rows[start..].iter().take(limit).cloned().collect();
            Ok(Some(ViewQueryResponse::non_reduced(
                rows,
                start as u64,
                self.rows.len() as u64,
            )))
        }
    }

    fn keys(page: &ViewQueryResponse<Row>) -> Vec<String> {
        page.rows().iter().map(|r| r.key.clone()).collect()
    }

    #[test]
    fn rejects_zero_page_size() {
        let res = PagedViewIterator::<Row, _>::new(0, FakeView::new(&["a"]));
        assert!(matches!(res, Err(Error::InvalidPageSize(0))));
        let res = PagedViewIterator::<Row, _>::new(usize::MAX, FakeView::new(&["a"]));
        assert!(matches!(res, Err(Error::InvalidPageSize(_))));
    }

    #[test]
    fn five_rows_in_pages_of_two() {
        let mut it = PagedViewIterator::<Row, _>::new(2, FakeView::new(&["A", "B", "C", "D", "E"])).unwrap();

        assert!(it.has_next());
        assert_eq!(keys(&it.next_page().unwrap()), vec!["A", "B"]);
        assert_eq!(it.cursor().unwrap().key, "C");
        assert_eq!(keys(&it.next_page().unwrap()), vec!["C", "D"]);
        assert_eq!(keys(&it.next_page().unwrap()), vec!["E"]);
        assert!(!it.has_next());
        assert_eq!(it.termination(), Some(Termination::Completed));
        assert!(matches!(it.next_page(), Err(Error::Exhausted)));
    }

    #[test]
    fn requests_one_extra_row_from_the_cursor() {
        let mut it = PagedViewIterator::<Row, _>::new(2, FakeView::new(&["A", "B", "C"])).unwrap();
        it.next_page().unwrap();
        it.next_page().unwrap();
        let requests = &it.fetcher.requests;
        assert_eq!(requests[0], (None, 3));
        assert_eq!(
            requests[1],
            (Some(RowReference::new("C".to_string(), Some("doc-C".into()))), 3)
        );
    }

    #[test]
    fn exactly_page_size_rows_is_one_page() {
        let mut it = PagedViewIterator::<Row, _>::new(2, FakeView::new(&["A", "B"])).unwrap();
        assert_eq!(keys(&it.next_page().unwrap()), vec!["A", "B"]);
        assert!(!it.has_next());
        assert_eq!(it.fetcher.requests.len(), 1);
    }

    #[test]
    fn empty_view_yields_one_empty_page() {
        let mut it = PagedViewIterator::<Row, _>::new(3, FakeView::new(&[])).unwrap();
        assert!(it.has_next());
        let page = it.next_page().unwrap();
        assert!(page.rows().is_empty());
        assert!(!it.has_next());
        assert!(matches!(it.next_page(), Err(Error::Exhausted)));
    }

    #[test]
    fn missing_rows_fail_with_fetch_error() {
        let fetcher = |_: Option<&RowReference<String>>, _: usize| -> Result<Option<ViewQueryResponse<Row>>> {
            Ok(Some(ViewQueryResponse::NonReduced(
                crate::response::NonReducedViewQueryResponse {
                    rows: None,
                    offset: Some(0),
                    total_rows: Some(0),
                    update_seq: None,
                },
            )))
        };
        let mut it = PagedViewIterator::<Row, _>::new(2, fetcher).unwrap();
        let err = it.next_page().unwrap_err();
        assert!(matches!(err, Error::Fetch(ref msg) if msg.contains("nextPage(null)")));
        // Nothing was consumed
        assert!(it.has_next());
        assert!(it.cursor().is_none());
    }

    #[test]
    fn no_response_is_a_fetch_error() {
        let fetcher =
            |_: Option<&RowReference<String>>, _: usize| -> Result<Option<ViewQueryResponse<Row>>> { Ok(None) };
        let mut it = PagedViewIterator::<Row, _>::new(2, fetcher).unwrap();
        assert!(matches!(it.next_page(), Err(Error::Fetch(_))));
    }

    #[test]
    fn fetcher_errors_propagate_unchanged() {
        let fetcher = |_: Option<&RowReference<String>>, _: usize| -> Result<Option<ViewQueryResponse<Row>>> {
            Err(Error::Decode {
                message: "expected value".into(),
                line: 1,
                column: 1,
            })
        };
        let mut it = PagedViewIterator::<Row, _>::new(2, fetcher).unwrap();
        assert!(matches!(it.next_page(), Err(Error::Decode { .. })));
    }

    #[test]
    fn over_limit_response_is_rejected() {
        let fetcher = |_: Option<&RowReference<String>>, limit: usize| -> Result<Option<ViewQueryResponse<Row>>> {
            let rows = (0..limit + 2).map(|i| row(&i.to_string())).collect();
            Ok(Some(ViewQueryResponse::non_reduced(rows, 0, 100)))
        };
        let mut it = PagedViewIterator::<Row, _>::new(2, fetcher).unwrap();
        assert!(matches!(it.next_page(), Err(Error::Fetch(ref m)) if m.contains("limit of 3")));
    }

    #[test]
    fn non_advancing_cursor_terminates() {
        let stalls: Rc<RefCell<Vec<StallEvent<String>>>> = Rc::default();
        let sink = stalls.clone();
        // Ignores the cursor and always serves the first three rows
        let fetcher = |_: Option<&RowReference<String>>, _: usize| -> Result<Option<ViewQueryResponse<Row>>> {
            Ok(Some(ViewQueryResponse::non_reduced(
                vec![row("A"), row("B"), row("C")],
                0,
                10,
            )))
        };
        let mut it = PagedViewIterator::<Row, _, _>::with_observer(
            2,
            fetcher,
            OnStall(move |e: &StallEvent<String>| sink.borrow_mut().push(e.clone())),
        )
        .unwrap();

        assert_eq!(keys(&it.next_page().unwrap()), vec!["A", "B"]);
        assert!(it.has_next());
        assert_eq!(keys(&it.next_page().unwrap()), vec!["A", "B"]);
        assert!(!it.has_next());
        assert_eq!(it.termination(), Some(Termination::Stalled));

        let stall = it.stall().unwrap();
        assert_eq!(stall.cursor.key, "C");
        assert_eq!(stall.unfetched_rows, Some(8));
        assert_eq!(stalls.borrow().len(), 1);
        assert!(matches!(it.next_page(), Err(Error::Exhausted)));
    }

    #[test]
    fn last_page_keeps_counts_only() {
        let mut it = PagedViewIterator::<Row, _, _>::with_observer(
            2,
            FakeView::new(&["A", "B", "C", "D"]),
            NoopObserver,
        )
        .unwrap();
        it.next_page().unwrap();
        let stats = it.last_page().unwrap();
        assert_eq!(stats.fetched_rows, 3);
        assert_eq!(stats.returned_rows, 2);
        assert_eq!(stats.offset, Some(0));
        assert_eq!(stats.total_rows, Some(4));
        assert!(stats.cursor.is_none());
    }

    #[test]
    fn reduced_pages_paginate_by_key() {
        let all: Vec<ReducedRow<String, u64>> = ["a", "b", "c"]
            .iter()
            .map(|k| ReducedRow {
                key: k.to_string(),
                value: 1,
            })
            .collect();
        let fetcher = move |cursor: Option<&RowReference<String>>,
                            limit: usize|
              -> Result<Option<ViewQueryResponse<ReducedRow<String, u64>>>> {
            let start = cursor
                .map(|c| all.iter().position(|r| r.key >= c.key).unwrap_or(all.len()))
                .unwrap_or(0);
            Ok(Some(ViewQueryResponse::reduced(
                all[start..].iter().take(limit).cloned().collect(),
            )))
        };
        let pages: Vec<_> = PagedViewIterator::<ReducedRow<String, u64>, _>::new(2, fetcher)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.is_reduced() && p.total_rows().is_none()));
        assert_eq!(pages[1].rows()[0].key, "c");
    }

    #[test]
    fn iterator_fuses_after_error() {
        let mut calls = 0;
        let fetcher = move |_: Option<&RowReference<String>>, _: usize| -> Result<Option<ViewQueryResponse<Row>>> {
            calls += 1;
            Err(Error::Fetch(format!("attempt {calls}")))
        };
        let mut it = PagedViewIterator::<Row, _>::new(2, fetcher).unwrap();
        assert!(matches!(it.next(), Some(Err(Error::Fetch(_)))));
        assert!(it.next().is_none());
    }
}

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::{Builder, Runtime};

use crate::codec::{JsonCodec, SerdeJsonCodec};
use crate::error::{Error, Result};
use crate::query::ViewQuery;
use crate::response::ViewQueryResponse;
use crate::row::{describe, RowIdentity, RowReference};

// ── Page fetcher capability ──────────────────────────────────

/// One blocking round-trip for one page.
///
/// `limit` is a hard upper bound on the rows returned. `Ok(None)` means the
/// fetch produced no response at all, which the pager reports as a fetch error.
pub trait PageFetcher<R: RowIdentity> {
    fn fetch_page(
        &mut self,
        cursor: Option<&RowReference<R::Key>>,
        limit: usize,
    ) -> Result<Option<ViewQueryResponse<R>>>;
}

impl<R, F> PageFetcher<R> for F
where
    R: RowIdentity,
    F: FnMut(Option<&RowReference<R::Key>>, usize) -> Result<Option<ViewQueryResponse<R>>>,
{
    fn fetch_page(
        &mut self,
        cursor: Option<&RowReference<R::Key>>,
        limit: usize,
    ) -> Result<Option<ViewQueryResponse<R>>> {
        self(cursor, limit)
    }
}

// ── HTTP-backed fetcher ──────────────────────────────────────

/// The caller's HTTP client: `GET path?params`, returning the body.
///
/// Failures should be reported as [`Error::Fetch`] or [`Error::Cancelled`].
pub trait Transport {
    fn get(&mut self, path: &str, params: &[(String, String)]) -> Result<Vec<u8>>;
}

impl<F> Transport for F
where
    F: FnMut(&str, &[(String, String)]) -> Result<Vec<u8>>,
{
    fn get(&mut self, path: &str, params: &[(String, String)]) -> Result<Vec<u8>> {
        self(path, params)
    }
}

/// Fetches pages of one view through a [`Transport`], decoding with a codec.
pub struct ViewFetcher<T, C = SerdeJsonCodec> {
    database: String,
    query: ViewQuery,
    transport: T,
    codec: C,
}

impl<T: Transport> ViewFetcher<T> {
    pub fn new(database: impl Into<String>, query: ViewQuery, transport: T) -> Self {
        Self::with_codec(database, query, transport, SerdeJsonCodec)
    }
}

impl<T: Transport, C: JsonCodec> ViewFetcher<T, C> {
    pub fn with_codec(
        database: impl Into<String>,
        query: ViewQuery,
        transport: T,
        codec: C,
    ) -> Self {
        Self {
            database: database.into(),
            query,
            transport,
            codec,
        }
    }

    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<R, T, C> PageFetcher<R> for ViewFetcher<T, C>
where
    R: RowIdentity + DeserializeOwned,
    R::Key: Serialize,
    T: Transport,
    C: JsonCodec,
{
    fn fetch_page(
        &mut self,
        cursor: Option<&RowReference<R::Key>>,
        limit: usize,
    ) -> Result<Option<ViewQueryResponse<R>>> {
        let path = self.query.path(&self.database);
        let params = self.query.params(&self.codec, cursor, limit)?;

        let body = self.transport.get(&path, &params).map_err(|e| match e {
            Error::Fetch(_) | Error::Cancelled => e,
            other => Error::Fetch(format!("GET {path} failed: {other}")),
        })?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        self.codec.decode_view_response(&body).map(Some)
    }
}

// ── Async bridge ─────────────────────────────────────────────

/// Runs an async page fetch to completion on a private current-thread
/// runtime, bounded by a timeout. A fetch that times out fails with
/// [`Error::Cancelled`]; no partial page is ever returned.
///
/// `fetch_page` blocks, so it must not be called from inside another
/// tokio runtime.
pub struct AsyncPageFetcher<F> {
    runtime: Runtime,
    timeout: Duration,
    fetch: F,
}

impl<F> AsyncPageFetcher<F> {
    pub fn new(timeout: Duration, fetch: F) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| Error::Config(format!("Could not start fetch runtime: {e}")))?;
        Ok(Self {
            runtime,
            timeout,
            fetch,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<R, F, Fut> PageFetcher<R> for AsyncPageFetcher<F>
where
    R: RowIdentity,
    R::Key: std::fmt::Debug,
    F: FnMut(Option<RowReference<R::Key>>, usize) -> Fut,
    Fut: Future<Output = Result<Option<ViewQueryResponse<R>>>>,
{
    fn fetch_page(
        &mut self,
        cursor: Option<&RowReference<R::Key>>,
        limit: usize,
    ) -> Result<Option<ViewQueryResponse<R>>> {
        let fut = (self.fetch)(cursor.cloned(), limit);
        let timeout = self.timeout;
        match self
            .runtime
            .block_on(async move { tokio::time::timeout(timeout, fut).await })
        {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                tracing::warn!(
                    timeout_ms,
                    cursor = %describe(cursor),
                    "page fetch timed out"
                );
                Err(Error::Cancelled)
            }
        }
    }
}

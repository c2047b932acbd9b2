//! Paginated CouchDB view queries.
//!
//! CouchDB views can only be paged by key: "give me `limit` rows starting at
//! `startkey`/`startkey_docid`". [`PagedViewIterator`] turns that into a lazy
//! sequence of pages, over-fetching one row per request to learn where the
//! next page starts and stopping if the cursor ever fails to advance.
//!
//! ```ignore
//! use couchview::{PagedViewIterator, ViewFetcher, ViewQuery, ViewRow};
//!
//! let query = ViewQuery::view("books", "by_author").include_docs(true);
//! let fetcher = ViewFetcher::new("library", query, my_transport);
//! for page in PagedViewIterator::<ViewRow<String>, _>::new(50, fetcher)? {
//!     for row in page?.into_rows() {
//!         println!("{} {}", row.key, row.id);
//!     }
//! }
//! ```

pub mod codec;
pub mod collate;
pub mod config;
pub mod debug;
pub mod document;
mod error;
pub mod fetcher;
pub mod iterator;
pub mod observer;
pub mod query;
pub mod response;
pub mod row;
pub mod stream;

pub use codec::{JsonCodec, SerdeJsonCodec};
pub use collate::ViewKey;
pub use config::ViewConfig;
pub use document::{Attachment, Document};
pub use error::{Error, Result};
pub use fetcher::{AsyncPageFetcher, PageFetcher, Transport, ViewFetcher};
pub use iterator::{PagedViewIterator, Termination};
pub use observer::{NoopObserver, OnStall, PageObserver, PageStats, StallEvent, TracingObserver};
pub use query::{ViewQuery, ViewTarget};
pub use response::{NonReducedViewQueryResponse, ReducedViewQueryResponse, ViewQueryResponse};
pub use row::{AllDocsRow, DocumentRow, ReducedRow, RowIdentity, RowReference, ViewRow};
pub use stream::RowStream;

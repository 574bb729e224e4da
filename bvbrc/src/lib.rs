//! BV-BRC Solr client.
//!
//! Query builders for the RQL and Lucene/Solr dialects, request execution
//! against both endpoints, and a resumable `cursorMark` pager for result
//! sets of any size.

pub mod collections;
pub mod config;
pub mod cursor;
pub mod error;
pub mod query;
pub mod transport;

pub use collections::{AsyncResource, Collection, Resource, StreamOptions};
pub use config::{Auth, Config};
pub use cursor::{AsyncCursorPager, CursorPager, CursorState, PagerOptions, Termination};
pub use error::{Error, Result};
pub use query::{lucene, rql, ParamsBuilder, QueryParams, Value};
pub use transport::{AsyncClient, AsyncFetch, BlockingClient, Fetch, WireFormat};

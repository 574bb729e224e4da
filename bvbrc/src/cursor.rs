//! Cursor-based deep pagination (`cursorMark`).
//!
//! [`CursorState`] holds every rule of the protocol: sort normalization,
//! per-page parameters, page buffering and the advance-or-terminate
//! decision. [`CursorPager`] (blocking) and [`AsyncCursorPager`] only
//! carry requests between the state and a fetcher.
//!
//! # Termination
//!
//! After the last document of a page has been handed out, iteration stops
//! when any of these hold:
//!
//! - the page had no documents
//! - the response carried no `nextCursorMark`
//! - `nextCursorMark` equals the cursor just used
//! - `nextCursorMark` equals the cursor used for the page before that
//!
//! Resuming: read [`CursorState::cursor`] between pages and pass it as
//! `start_cursor` to a fresh pager.

use std::collections::VecDeque;

use futures_util::Stream;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::query::QueryParams;
use crate::transport::{AsyncFetch, Fetch};
use crate::{Error, Result};

/// Cursor value that starts at the beginning of the result set.
pub const START_CURSOR: &str = "*";

/// Rows per page when the caller does not choose.
pub const DEFAULT_ROWS: usize = 1000;

/// Construction options for a pager.
#[derive(Debug, Clone, PartialEq)]
pub struct PagerOptions {
    pub rows: usize,
    pub sort: Option<String>,
    /// Uniquely-valued field used as the sort tie-breaker.
    pub unique_key: Option<String>,
    pub start_cursor: String,
}

impl Default for PagerOptions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            sort: None,
            unique_key: None,
            start_cursor: START_CURSOR.to_string(),
        }
    }
}

impl PagerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn unique_key(mut self, field: impl Into<String>) -> Self {
        self.unique_key = Some(field.into());
        self
    }

    pub fn start_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.start_cursor = cursor.into();
        self
    }
}

/// Why a pager stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    EmptyPage,
    NoCursor,
    CursorUnchanged,
    CursorCycle,
    /// A fetch failed; the error went to the consumer.
    Failed,
}

/// One decoded page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub docs: Vec<Json>,
    pub next_cursor: Option<String>,
}

impl Page {
    /// Decode `{"response": {"docs": [...]}, "nextCursorMark": ...}`.
    ///
    /// A missing `response` or `docs` is an empty page.
    pub fn from_response(mut body: Json) -> Result<Self> {
        let docs = match body.pointer_mut("/response/docs").map(Json::take) {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(docs)) => docs,
            Some(other) => {
                return Err(Error::Decode(format!("response.docs is not an array: {}", other)))
            }
        };
        let next_cursor = match body.get("nextCursorMark") {
            None | Some(Json::Null) => None,
            Some(Json::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(Error::Decode(format!("nextCursorMark is not a string: {}", other)))
            }
        };
        Ok(Self { docs, next_cursor })
    }
}

/// What a driver should do next.
#[derive(Debug, PartialEq)]
pub enum Step {
    /// Hand this document to the consumer.
    Yield(Json),
    /// Fetch the next page with these parameters.
    Fetch(QueryParams),
    /// Iteration is over.
    Done,
}

/// Resolve the sort used for cursor paging.
///
/// With no sort, the unique key ascending. With a sort that does not
/// mention the unique key, the unique key is appended as tie-breaker.
pub fn normalize_sort(sort: Option<&str>, unique_key: Option<&str>) -> Result<String> {
    let sort = sort.map(str::trim).filter(|s| !s.is_empty());
    let unique_key = unique_key.map(str::trim).filter(|s| !s.is_empty());

    match (sort, unique_key) {
        (None, None) => Err(Error::Validation(
            "cursor paging needs a sort or a unique key for a total order".to_string(),
        )),
        (None, Some(key)) => Ok(format!("{} asc", key)),
        (Some(sort), None) => Ok(sort.to_string()),
        (Some(sort), Some(key)) if sort_references(sort, key) => Ok(sort.to_string()),
        (Some(sort), Some(key)) => Ok(format!("{}, {} asc", sort, key)),
    }
}

/// Whether any clause of a sort expression sorts on `field`.
fn sort_references(sort: &str, field: &str) -> bool {
    sort.split(',')
        .filter_map(|clause| clause.split_whitespace().next())
        .any(|name| name == field)
}

/// Cursor paging state shared by the blocking and async pagers.
#[derive(Debug)]
pub struct CursorState {
    collection: String,
    base_params: QueryParams,
    sort: String,
    unique_key: Option<String>,
    rows: usize,
    cursor: String,
    previous: Option<String>,
    buffer: VecDeque<Json>,
    /// Next cursor of the page being drained; `Some` while a page is open.
    pending: Option<Option<String>>,
    pending_len: usize,
    terminated: Option<Termination>,
    pages: usize,
}

impl CursorState {
    pub fn new(
        collection: impl Into<String>,
        base_params: QueryParams,
        options: PagerOptions,
    ) -> Result<Self> {
        let sort = normalize_sort(options.sort.as_deref(), options.unique_key.as_deref())?;
        if options.rows == 0 {
            return Err(Error::Validation("rows per page must be at least 1".to_string()));
        }
        Ok(Self {
            collection: collection.into(),
            base_params,
            sort,
            unique_key: options.unique_key,
            rows: options.rows,
            cursor: options.start_cursor,
            previous: None,
            buffer: VecDeque::new(),
            pending: None,
            pending_len: 0,
            terminated: None,
            pages: 0,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn effective_sort(&self) -> &str {
        &self.sort
    }

    pub fn unique_key(&self) -> Option<&str> {
        self.unique_key.as_deref()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cursor of the page currently being served (or about to be fetched).
    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub fn termination(&self) -> Option<Termination> {
        self.terminated
    }

    pub fn is_done(&self) -> bool {
        self.terminated.is_some()
    }

    /// Parameters for the next page: base params plus rows, sort, cursor.
    pub fn page_params(&self) -> QueryParams {
        let mut params = self.base_params.clone();
        params.set("rows", self.rows);
        params.set("sort", self.sort.clone());
        params.set("cursorMark", self.cursor.clone());
        params
    }

    /// Advance the state machine by one step.
    pub fn step(&mut self) -> Step {
        if let Some(doc) = self.buffer.pop_front() {
            return Step::Yield(doc);
        }
        if let Some(next) = self.pending.take() {
            self.advance(next);
        }
        if self.terminated.is_some() {
            return Step::Done;
        }
        Step::Fetch(self.page_params())
    }

    /// Feed the result of the fetch requested by [`Step::Fetch`].
    ///
    /// On error the state terminates and the error is handed back for the
    /// consumer. Documents are only buffered once the whole page decoded.
    pub fn accept(&mut self, response: Result<Json>) -> Result<()> {
        let page = match response.and_then(Page::from_response) {
            Ok(page) => page,
            Err(e) => {
                warn!(collection = %self.collection, cursor = %self.cursor, kind = e.kind(), "page fetch failed");
                self.terminated = Some(Termination::Failed);
                return Err(e);
            }
        };
        self.pages += 1;
        debug!(
            collection = %self.collection,
            cursor = %self.cursor,
            docs = page.docs.len(),
            next = ?page.next_cursor,
            "page"
        );
        self.pending_len = page.docs.len();
        self.pending = Some(page.next_cursor);
        self.buffer.extend(page.docs);
        Ok(())
    }

    fn advance(&mut self, next: Option<String>) {
        let reason = match next {
            _ if self.pending_len == 0 => Some(Termination::EmptyPage),
            None => Some(Termination::NoCursor),
            Some(ref n) if *n == self.cursor => Some(Termination::CursorUnchanged),
            Some(ref n) if self.previous.as_deref() == Some(n.as_str()) => {
                Some(Termination::CursorCycle)
            }
            Some(n) => {
                self.previous = Some(std::mem::replace(&mut self.cursor, n));
                None
            }
        };
        if let Some(reason) = reason {
            debug!(collection = %self.collection, ?reason, pages = self.pages, "cursor paging finished");
            self.terminated = Some(reason);
        }
    }
}

/// Blocking cursor pager. Yields documents in server order.
///
/// After an error is yielded the iterator is exhausted.
pub struct CursorPager<F> {
    fetcher: F,
    state: CursorState,
}

impl<F: Fetch> CursorPager<F> {
    pub fn new(
        fetcher: F,
        collection: impl Into<String>,
        base_params: QueryParams,
        options: PagerOptions,
    ) -> Result<Self> {
        let state = CursorState::new(collection, base_params, options)?;
        Ok(Self { fetcher, state })
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }
}

impl<F: Fetch> Iterator for CursorPager<F> {
    type Item = Result<Json>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state.step() {
                Step::Yield(doc) => return Some(Ok(doc)),
                Step::Done => return None,
                Step::Fetch(params) => {
                    let response = self.fetcher.select(self.state.collection(), &params);
                    if let Err(e) = self.state.accept(response) {
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}

/// Async cursor pager. One page request in flight at a time.
pub struct AsyncCursorPager<F> {
    fetcher: F,
    state: CursorState,
}

impl<F: AsyncFetch> AsyncCursorPager<F> {
    pub fn new(
        fetcher: F,
        collection: impl Into<String>,
        base_params: QueryParams,
        options: PagerOptions,
    ) -> Result<Self> {
        let state = CursorState::new(collection, base_params, options)?;
        Ok(Self { fetcher, state })
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Next document, `None` when iteration is over.
    pub async fn next_doc(&mut self) -> Option<Result<Json>> {
        loop {
            match self.state.step() {
                Step::Yield(doc) => return Some(Ok(doc)),
                Step::Done => return None,
                Step::Fetch(params) => {
                    let response = self.fetcher.select(self.state.collection(), &params).await;
                    if let Err(e) = self.state.accept(response) {
                        return Some(Err(e));
                    }
                }
            }
        }
    }

    /// Drain every remaining document, stopping at the first error.
    pub async fn collect_docs(mut self) -> Result<Vec<Json>> {
        let mut docs = Vec::new();
        while let Some(doc) = self.next_doc().await {
            docs.push(doc?);
        }
        Ok(docs)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Json>> {
        futures_util::stream::unfold(self, |mut pager| async move {
            pager.next_doc().await.map(|item| (item, pager))
        })
    }
}

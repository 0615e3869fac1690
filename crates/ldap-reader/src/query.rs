//! Paged query engine
//!
//! Owns the active query and the page currently held in memory. Each page
//! round trip builds a fresh paging control from the cookie of the previous
//! page, runs the search, and decodes the cookie for the next one.

use tracing::{debug, instrument, warn};

use crate::config::{default_max_attributes, default_page_size, default_paging_critical};
use crate::error::{ReaderError, ReaderResult};
use crate::gateway::{Control, DirectoryConnection, Entry, SearchRequest};
use crate::session::Session;

/// Search parameters, fixed for the lifetime of one page sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub filter: String,
    pub base: String,
    /// Requested attribute names. Empty requests all attributes.
    pub attributes: Vec<String>,
    pub page_size: u32,
    pub critical: bool,
}

/// Continuation state between pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageState {
    /// Cookie to present with the next request. Empty before the first page
    /// and after the last one.
    pub cookie: Vec<u8>,
    pub more_pages: bool,
    /// Server-reported result count of the last page.
    pub result_count: u32,
}

/// Runs one paged search at a time.
#[derive(Debug)]
pub struct PagedQuery {
    page_size: u32,
    paging_critical: bool,
    max_attributes: usize,
    query: Option<Query>,
    state: PageState,
    control: Option<Control>,
    page: Option<Vec<Entry>>,
    pages_fetched: usize,
}

impl Default for PagedQuery {
    fn default() -> Self {
        Self::new(
            default_page_size(),
            default_paging_critical(),
            default_max_attributes(),
        )
    }
}

impl PagedQuery {
    pub fn new(page_size: u32, paging_critical: bool, max_attributes: usize) -> Self {
        Self {
            page_size,
            paging_critical,
            max_attributes,
            query: None,
            state: PageState::default(),
            control: None,
            page: None,
            pages_fetched: 0,
        }
    }

    /// Page size used by subsequent queries. A running page sequence keeps
    /// the size it started with.
    pub fn set_page_size(&mut self, page_size: u32) -> ReaderResult<()> {
        if page_size == 0 {
            return Err(ReaderError::validation("page size must be greater than 0"));
        }
        self.page_size = page_size;
        Ok(())
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn max_attributes(&self) -> usize {
        self.max_attributes
    }

    /// Start a new query and fetch its first page.
    ///
    /// Validation and state checks run before anything is discarded, so a
    /// rejected call leaves the previous query untouched.
    pub fn start<C, S>(
        &mut self,
        session: &mut Session<C>,
        filter: &str,
        base: &str,
        attributes: &[S],
    ) -> ReaderResult<()>
    where
        C: DirectoryConnection,
        S: AsRef<str>,
    {
        if attributes.len() > self.max_attributes {
            return Err(ReaderError::validation(format!(
                "too many attributes requested: {} (maximum {})",
                attributes.len(),
                self.max_attributes
            )));
        }

        if !session.is_bound() {
            return Err(ReaderError::state("not bound"));
        }

        self.page = None;
        self.control = None;
        self.state = PageState::default();
        self.pages_fetched = 0;
        self.query = Some(Query {
            filter: filter.to_string(),
            base: base.to_string(),
            attributes: attributes.iter().map(|a| a.as_ref().to_string()).collect(),
            page_size: self.page_size,
            critical: self.paging_critical,
        });

        self.fetch_page(session)
    }

    /// Fetch the page following the current one.
    pub(crate) fn fetch_next_page<C: DirectoryConnection>(
        &mut self,
        session: &mut Session<C>,
    ) -> ReaderResult<()> {
        if !self.state.more_pages {
            return Err(ReaderError::state("no more pages"));
        }
        self.fetch_page(session)
    }

    /// Any failure drops the held page; only a new query recovers.
    fn fetch_page<C: DirectoryConnection>(&mut self, session: &mut Session<C>) -> ReaderResult<()> {
        let result = self.round_trip(session.connection_mut());
        if let Err(e) = &result {
            warn!(error = %e, page = self.pages_fetched + 1, "Page fetch failed");
            self.page = None;
            self.control = None;
            self.state.more_pages = false;
        }
        result
    }

    #[instrument(skip_all, fields(page = self.pages_fetched + 1))]
    fn round_trip<C: DirectoryConnection>(&mut self, connection: &mut C) -> ReaderResult<()> {
        let query = self
            .query
            .as_ref()
            .ok_or_else(|| ReaderError::state("no active query"))?;

        // Previous page and control are released before the new request.
        self.page = None;
        self.control = None;

        let control =
            connection.create_paging_control(query.page_size, &self.state.cookie, query.critical)?;
        let controls = std::slice::from_ref(self.control.insert(control));

        let response = connection.search(&SearchRequest {
            base: &query.base,
            filter: &query.filter,
            attributes: &query.attributes,
            controls,
        })?;

        let paging = response.paging_control().ok_or_else(|| {
            ReaderError::protocol("server did not return a paged results control")
        })?;
        let page_response = connection.parse_paging_response(paging)?;

        self.state.more_pages = !page_response.cookie.is_empty();
        self.state.cookie = page_response.cookie;
        self.state.result_count = page_response.count;
        self.pages_fetched += 1;

        debug!(
            entries = response.entries.len(),
            more_pages = self.state.more_pages,
            "Page received"
        );

        self.page = Some(response.entries);
        Ok(())
    }

    /// Entries of the page currently held, if any.
    pub fn page(&self) -> Option<&[Entry]> {
        self.page.as_deref()
    }

    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    pub fn page_state(&self) -> &PageState {
        &self.state
    }

    pub fn has_more_pages(&self) -> bool {
        self.state.more_pages
    }

    /// Server-reported result count of the last page.
    pub fn result_count(&self) -> u32 {
        self.state.result_count
    }

    /// Pages fetched for the current query.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

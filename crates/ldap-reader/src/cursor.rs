//! Result cursor
//!
//! Walks the entries of the engine's current page and pulls the next page
//! when the current one runs out. The position is an index into the page
//! held by the engine and is reset whenever that page is replaced.

use crate::error::ReaderResult;
use crate::gateway::{DirectoryConnection, Entry};
use crate::query::PagedQuery;
use crate::session::Session;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Position {
    /// Before the first entry of the held page.
    #[default]
    Start,
    At(usize),
    /// Past the last entry of the held page.
    End,
}

/// Cursor over the entries of a paged query.
#[derive(Debug, Default)]
pub struct ResultCursor {
    position: Position,
}

impl ResultCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the current position. Called whenever a new query starts.
    pub fn reset(&mut self) {
        self.position = Position::Start;
    }

    /// Advance to the next entry, fetching pages as needed.
    ///
    /// Returns `Ok(false)` once every page is consumed, and keeps returning
    /// it until a new query starts. Empty intermediate pages are skipped.
    pub fn advance<C: DirectoryConnection>(
        &mut self,
        engine: &mut PagedQuery,
        session: &mut Session<C>,
    ) -> ReaderResult<bool> {
        loop {
            let Some(page) = engine.page() else {
                self.position = Position::End;
                return Ok(false);
            };

            let next = match self.position {
                Position::Start => 0,
                Position::At(index) => index + 1,
                Position::End => page.len(),
            };

            if next < page.len() {
                self.position = Position::At(next);
                return Ok(true);
            }

            self.position = Position::End;
            if !engine.has_more_pages() {
                return Ok(false);
            }

            // A new page starts over at its first entry, even on failure:
            // the engine holds no page then, so later calls return false.
            let fetched = engine.fetch_next_page(session);
            self.position = Position::Start;
            fetched?;
        }
    }

    /// Entry under the cursor.
    pub fn current<'a>(&self, engine: &'a PagedQuery) -> Option<&'a Entry> {
        match self.position {
            Position::At(index) => engine.page()?.get(index),
            Position::Start | Position::End => None,
        }
    }
}

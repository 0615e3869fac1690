//! Reader facade
//!
//! [`LdapReader`] bundles one session, one paged query and one cursor.

use tracing::{debug, info};

use crate::attribute::AttributeValues;
use crate::config::{default_protocol_version, ReaderConfig};
use crate::cursor::ResultCursor;
use crate::error::{ReaderError, ReaderResult};
use crate::gateway::ldap::{Ldap3Connection, Ldap3Gateway};
use crate::gateway::{DirectoryConnection, DirectoryGateway};
use crate::query::PagedQuery;
use crate::session::Session;

/// Paged directory reader: bind, query, then walk entries with
/// [`fetch`](Self::fetch).
pub struct LdapReader<C: DirectoryConnection> {
    session: Session<C>,
    engine: PagedQuery,
    cursor: ResultCursor,
}

/// Reader backed by the `ldap3` gateway.
pub type Ldap3Reader = LdapReader<Ldap3Connection>;

impl<C: DirectoryConnection> LdapReader<C> {
    /// Initialize a session with protocol version 3. No bind is attempted.
    pub fn new<G>(gateway: &G, uri: &str) -> ReaderResult<Self>
    where
        G: DirectoryGateway<Connection = C>,
    {
        Self::with_version(gateway, uri, default_protocol_version())
    }

    /// Initialize a session with `version` (`0` keeps the gateway default).
    pub fn with_version<G>(gateway: &G, uri: &str, version: u32) -> ReaderResult<Self>
    where
        G: DirectoryGateway<Connection = C>,
    {
        Self::connect(gateway, &ReaderConfig::new(uri).with_protocol_version(version))
    }

    /// Initialize a session with protocol version 3 and bind.
    pub fn with_credentials<G>(gateway: &G, uri: &str, user: &str, pass: &str) -> ReaderResult<Self>
    where
        G: DirectoryGateway<Connection = C>,
    {
        Self::with_credentials_and_version(gateway, uri, user, pass, default_protocol_version())
    }

    /// Initialize a session with `version` and bind.
    pub fn with_credentials_and_version<G>(
        gateway: &G,
        uri: &str,
        user: &str,
        pass: &str,
        version: u32,
    ) -> ReaderResult<Self>
    where
        G: DirectoryGateway<Connection = C>,
    {
        Self::connect(
            gateway,
            &ReaderConfig::new(uri)
                .with_protocol_version(version)
                .with_credentials(user, pass),
        )
    }

    /// Build a reader from configuration, binding when credentials are set.
    pub fn connect<G>(gateway: &G, config: &ReaderConfig) -> ReaderResult<Self>
    where
        G: DirectoryGateway<Connection = C>,
    {
        config.validate()?;
        debug!(config = ?config.redacted(), "Connecting reader");

        let session = match (&config.bind_dn, &config.bind_password) {
            (Some(user), Some(pass)) => {
                Session::open_and_bind(gateway, &config.uri, config.protocol_version, user, pass)?
            }
            _ => Session::open(gateway, &config.uri, config.protocol_version)?,
        };

        Ok(Self {
            session,
            engine: PagedQuery::new(
                config.page_size,
                config.paging_critical,
                config.max_attributes,
            ),
            cursor: ResultCursor::new(),
        })
    }

    /// Bind with the credentials already held.
    pub fn bind(&mut self, rebind: bool) -> ReaderResult<()> {
        self.session.bind(rebind)
    }

    /// Replace the credentials and bind. Use `rebind` to switch accounts on a
    /// bound session.
    pub fn bind_as(&mut self, user: &str, pass: &str, rebind: bool) -> ReaderResult<()> {
        self.session.bind_as(user, pass, rebind)
    }

    /// Page size for subsequent queries.
    pub fn set_page_size(&mut self, page_size: u32) -> ReaderResult<()> {
        self.engine.set_page_size(page_size)
    }

    /// Query all attributes.
    pub fn query(&mut self, filter: &str, base: &str) -> ReaderResult<()> {
        self.query_attributes::<&str>(filter, base, &[])
    }

    /// Query the given attributes and fetch the first page.
    pub fn query_attributes<S: AsRef<str>>(
        &mut self,
        filter: &str,
        base: &str,
        attributes: &[S],
    ) -> ReaderResult<()> {
        self.engine
            .start(&mut self.session, filter, base, attributes)?;
        self.cursor.reset();

        info!(
            filter = %filter,
            base = %base,
            attributes = attributes.len(),
            "Query started"
        );
        Ok(())
    }

    /// Move to the next entry, across page boundaries.
    ///
    /// Returns `Ok(false)` when the query is exhausted (or none was run) and
    /// keeps doing so until the next query.
    pub fn fetch(&mut self) -> ReaderResult<bool> {
        self.cursor.advance(&mut self.engine, &mut self.session)
    }

    /// Distinguished name of the current entry.
    pub fn current_dn(&self) -> Option<&str> {
        self.cursor.current(&self.engine).map(|e| e.dn())
    }

    /// Values of `name` on the current entry.
    ///
    /// `Ok(None)` when the entry lacks the attribute; a state error when no
    /// entry is current.
    pub fn get_attribute(&self, name: &str) -> ReaderResult<Option<AttributeValues>> {
        let entry = self
            .cursor
            .current(&self.engine)
            .ok_or_else(|| ReaderError::state("no current entry"))?;

        Ok(AttributeValues::from_entry(entry, name))
    }

    pub fn is_bound(&self) -> bool {
        self.session.is_bound()
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn page_size(&self) -> u32 {
        self.engine.page_size()
    }

    pub fn has_more_pages(&self) -> bool {
        self.engine.has_more_pages()
    }

    /// Server-reported result count of the last page.
    pub fn result_count(&self) -> u32 {
        self.engine.result_count()
    }

    pub fn pages_fetched(&self) -> usize {
        self.engine.pages_fetched()
    }
}

impl Ldap3Reader {
    /// Connect to a real server through `ldap3`.
    pub fn open(config: &ReaderConfig) -> ReaderResult<Self> {
        Self::connect(&Ldap3Gateway::new(config.connection.clone()), config)
    }
}

impl<C: DirectoryConnection> std::fmt::Debug for LdapReader<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapReader")
            .field("session", &self.session)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

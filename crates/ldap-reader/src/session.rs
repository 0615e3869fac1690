//! Session management
//!
//! A [`Session`] owns one connection handle and tracks bind state:
//! `Uninitialized -> Initialized -> (VersionSet)? -> Unbound -> Bound`.
//! Construction runs the whole chain up to the requested state; if any step
//! fails, nothing usable is returned.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument, warn};

use crate::error::{ReaderError, ReaderResult};
use crate::gateway::{DirectoryConnection, DirectoryGateway};

/// Bind state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
    Unbound,
    Bound,
}

/// Principal and secret used for binding. The secret is zeroized on drop.
struct Credentials {
    principal: String,
    secret: SecretString,
}

impl Credentials {
    fn new(principal: &str, secret: &str) -> Self {
        Self {
            principal: principal.to_string(),
            secret: SecretString::from(secret.to_string()),
        }
    }
}

/// An initialized connection plus its bind state.
pub struct Session<C: DirectoryConnection> {
    connection: C,
    uri: String,
    protocol_version: Option<u32>,
    state: BindState,
    credentials: Option<Credentials>,
    server_credentials: Option<Vec<u8>>,
}

impl<C: DirectoryConnection> Session<C> {
    /// Initialize a connection to `uri`.
    ///
    /// `protocol_version == 0` keeps the gateway default; any other value is
    /// negotiated and a rejection fails construction.
    #[instrument(skip(gateway))]
    pub fn open<G>(gateway: &G, uri: &str, protocol_version: u32) -> ReaderResult<Self>
    where
        G: DirectoryGateway<Connection = C>,
    {
        let connection = gateway.initialize(uri).map_err(|e| {
            ReaderError::connection_with_source(format!("failed to initialize {uri}"), e)
        })?;

        let mut session = Self {
            connection,
            uri: uri.to_string(),
            protocol_version: None,
            state: BindState::Unbound,
            credentials: None,
            server_credentials: None,
        };

        if protocol_version != 0 {
            session.connection.set_protocol_version(protocol_version)?;
            session.protocol_version = Some(protocol_version);
        }

        debug!(version = ?session.protocol_version, "Session initialized");
        Ok(session)
    }

    /// Initialize a connection and bind immediately.
    pub fn open_and_bind<G>(
        gateway: &G,
        uri: &str,
        protocol_version: u32,
        principal: &str,
        secret: &str,
    ) -> ReaderResult<Self>
    where
        G: DirectoryGateway<Connection = C>,
    {
        let mut session = Self::open(gateway, uri, protocol_version)?;
        session.bind_as(principal, secret, false)?;
        Ok(session)
    }

    /// Bind with the credentials already held by the session.
    ///
    /// Fails with a state error when already bound (unless `rebind`) or when
    /// no credentials have been set.
    pub fn bind(&mut self, rebind: bool) -> ReaderResult<()> {
        self.ensure_can_bind(rebind)?;

        if self.credentials.is_none() {
            return Err(ReaderError::state("no credentials"));
        }

        self.execute_bind()
    }

    /// Replace the held credentials and bind with them.
    ///
    /// The state check runs first, so a refused call leaves the previous
    /// credentials in place.
    pub fn bind_as(&mut self, principal: &str, secret: &str, rebind: bool) -> ReaderResult<()> {
        self.ensure_can_bind(rebind)?;

        // Dropping the old value zeroizes its secret.
        self.credentials = Some(Credentials::new(principal, secret));

        self.execute_bind()
    }

    pub fn is_bound(&self) -> bool {
        self.state == BindState::Bound
    }

    pub fn state(&self) -> BindState {
        self.state
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Negotiated protocol version, or `None` when the gateway default is used.
    pub fn protocol_version(&self) -> Option<u32> {
        self.protocol_version
    }

    /// Principal of the held credentials.
    pub fn principal(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.principal.as_str())
    }

    /// Credential blob returned by the server on the last successful bind.
    pub fn server_credentials(&self) -> Option<&[u8]> {
        self.server_credentials.as_deref()
    }

    pub(crate) fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    fn ensure_can_bind(&self, rebind: bool) -> ReaderResult<()> {
        if self.is_bound() && !rebind {
            return Err(ReaderError::state("already bound"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(uri = %self.uri))]
    fn execute_bind(&mut self) -> ReaderResult<()> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ReaderError::state("no credentials"))?;

        let server_credentials = match self
            .connection
            .bind(&credentials.principal, credentials.secret.expose_secret())
        {
            Ok(blob) => blob,
            Err(e) => {
                // A failed bind leaves the connection anonymous.
                warn!(principal = %credentials.principal, error = %e, "Bind failed");
                self.state = BindState::Unbound;
                self.server_credentials = None;
                return Err(e.into());
            }
        };

        info!(principal = %credentials.principal, "Bind successful");
        self.server_credentials = server_credentials;
        self.state = BindState::Bound;
        Ok(())
    }
}

impl<C: DirectoryConnection> Drop for Session<C> {
    fn drop(&mut self) {
        if let Err(e) = self.connection.unbind() {
            debug!(error = %e, "Unbind on session drop failed");
        }
    }
}

impl<C: DirectoryConnection> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("uri", &self.uri)
            .field("protocol_version", &self.protocol_version)
            .field("state", &self.state)
            .field("principal", &self.principal())
            .field(
                "secret",
                &self.credentials.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::stub::StubGateway;

    fn open() -> Session<crate::gateway::stub::StubConnection> {
        Session::open(&StubGateway::default(), "ldap://ldap.example.com", 3).unwrap()
    }

    #[test]
    fn test_open_starts_unbound() {
        let session = open();

        assert_eq!(session.state(), BindState::Unbound);
        assert_eq!(session.protocol_version(), Some(3));
        assert_eq!(session.uri(), "ldap://ldap.example.com");
        assert!(session.principal().is_none());
    }

    #[test]
    fn test_open_with_zero_version_keeps_default() {
        let session =
            Session::open(&StubGateway::default(), "ldap://ldap.example.com", 0).unwrap();

        assert_eq!(session.protocol_version(), None);
    }

    #[test]
    fn test_bind_without_credentials() {
        let mut session = open();

        let err = session.bind(false).unwrap_err();
        assert!(err.is_state());
        assert_eq!(err.to_string(), "invalid state: no credentials");
        assert_eq!(session.connection.binds, 0);
    }

    #[test]
    fn test_bind_twice_requires_rebind() {
        let mut session = open();
        session
            .bind_as("cn=reader,dc=example,dc=com", "secret", false)
            .unwrap();
        assert!(session.is_bound());

        let err = session.bind(false).unwrap_err();
        assert_eq!(err.to_string(), "invalid state: already bound");
        assert_eq!(session.connection.binds, 1);

        session.bind(true).unwrap();
        assert_eq!(session.connection.binds, 2);
        assert!(session.is_bound());
    }

    #[test]
    fn test_refused_bind_as_keeps_credentials() {
        let mut session = open();
        session
            .bind_as("cn=reader,dc=example,dc=com", "secret", false)
            .unwrap();

        assert!(session
            .bind_as("cn=other,dc=example,dc=com", "other", false)
            .is_err());
        assert_eq!(session.principal(), Some("cn=reader,dc=example,dc=com"));

        session
            .bind_as("cn=other,dc=example,dc=com", "other", true)
            .unwrap();
        assert_eq!(session.principal(), Some("cn=other,dc=example,dc=com"));
    }

    #[test]
    fn test_failed_rebind_leaves_session_unbound() {
        let mut session = open();
        session
            .bind_as("cn=reader,dc=example,dc=com", "secret", false)
            .unwrap();
        assert!(session.is_bound());

        session.connection.reject_binds = true;
        let err = session
            .bind_as("cn=other,dc=example,dc=com", "wrong", true)
            .unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(session.state(), BindState::Unbound);
        assert!(session.server_credentials().is_none());

        // Unbound again, so a plain bind is allowed without `rebind`.
        session.connection.reject_binds = false;
        session.bind(false).unwrap();
        assert!(session.is_bound());
        assert_eq!(session.principal(), Some("cn=other,dc=example,dc=com"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let mut session = open();
        session
            .bind_as("cn=reader,dc=example,dc=com", "hunter2", false)
            .unwrap();

        let debug = format!("{session:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***REDACTED***"));
    }
}

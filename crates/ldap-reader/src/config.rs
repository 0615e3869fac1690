//! Reader configuration
//!
//! Defaults: page size 1000, mandatory (critical) paging, at most 50
//! requested attributes, protocol version 3.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ReaderError, ReaderResult};

/// Configuration for an [`LdapReader`](crate::LdapReader).
#[derive(Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Server connection URI (e.g., "ldap://ldap.example.com:389").
    pub uri: String,

    /// Protocol version to negotiate. `0` keeps the gateway default.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,

    /// Bind DN (e.g., "cn=reader,ou=Accounts,dc=example,dc=com").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Entries requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Mark the paging control critical, so servers without paging support
    /// reject the search instead of ignoring the control.
    #[serde(default = "default_paging_critical")]
    pub paging_critical: bool,

    /// Maximum number of attribute names accepted by one query.
    #[serde(default = "default_max_attributes")]
    pub max_attributes: usize,

    /// Transport settings.
    #[serde(default)]
    pub connection: ConnectionSettings,
}

impl std::fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("uri", &self.uri)
            .field("protocol_version", &self.protocol_version)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("page_size", &self.page_size)
            .field("paging_critical", &self.paging_critical)
            .field("max_attributes", &self.max_attributes)
            .field("connection", &self.connection)
            .finish()
    }
}

pub(crate) fn default_protocol_version() -> u32 {
    3
}

pub(crate) fn default_page_size() -> u32 {
    1000
}

pub(crate) fn default_paging_critical() -> bool {
    true
}

pub(crate) fn default_max_attributes() -> usize {
    50
}

impl ReaderConfig {
    /// Create a config for the given URI with all defaults and no credentials.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            protocol_version: default_protocol_version(),
            bind_dn: None,
            bind_password: None,
            page_size: default_page_size(),
            paging_critical: default_paging_critical(),
            max_attributes: default_max_attributes(),
            connection: ConnectionSettings::default(),
        }
    }

    /// Set bind credentials. The reader binds as part of construction.
    #[must_use]
    pub fn with_credentials(
        mut self,
        bind_dn: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.bind_dn = Some(bind_dn.into());
        self.bind_password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_protocol_version(mut self, version: u32) -> Self {
        self.protocol_version = version;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_paging_critical(mut self, critical: bool) -> Self {
        self.paging_critical = critical;
        self
    }

    #[must_use]
    pub fn with_max_attributes(mut self, max: usize) -> Self {
        self.max_attributes = max;
        self
    }

    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionSettings) -> Self {
        self.connection = connection;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ReaderResult<()> {
        if self.uri.trim().is_empty() {
            return Err(ReaderError::validation("uri is required"));
        }

        if self.page_size == 0 {
            return Err(ReaderError::validation("page_size must be greater than 0"));
        }

        if self.bind_dn.is_some() != self.bind_password.is_some() {
            return Err(ReaderError::validation(
                "bind_dn and bind_password must be set together",
            ));
        }

        if self.connection.starttls && self.uri.starts_with("ldaps://") {
            return Err(ReaderError::validation(
                "cannot use STARTTLS on an ldaps:// connection",
            ));
        }

        Ok(())
    }

    /// Create a redacted copy (for logging/display).
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.bind_password.is_some() {
            config.bind_password = Some("***REDACTED***".to_string());
        }
        config
    }
}

/// Transport settings handed to the gateway at initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Upgrade a plain connection with STARTTLS.
    #[serde(default)]
    pub starttls: bool,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub no_tls_verify: bool,
}

fn default_connection_timeout() -> u64 {
    30
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout(),
            starttls: false,
            no_tls_verify: false,
        }
    }
}

impl ConnectionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn with_connection_timeout(mut self, secs: u64) -> Self {
        self.connection_timeout_secs = secs;
        self
    }

    /// Enable STARTTLS.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.starttls = true;
        self
    }

    /// Get connection timeout as Duration.
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

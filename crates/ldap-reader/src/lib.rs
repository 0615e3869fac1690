//! # LDAP Reader
//!
//! Paged LDAP searches behind a lazy, page-spanning entry cursor.
//!
//! A reader binds once, issues a search bounded by the simple paged results
//! control (RFC 2696), and hands out entries one at a time. When a page runs
//! out, the next one is requested with the server's continuation cookie
//! without the caller noticing.
//!
//! ## Example
//!
//! ```no_run
//! use ldap_reader::{Ldap3Reader, ReaderConfig};
//!
//! # fn main() -> Result<(), ldap_reader::ReaderError> {
//! let config = ReaderConfig::new("ldap://ldap.example.com")
//!     .with_credentials("cn=reader,ou=Accounts,dc=example,dc=com", "secret")
//!     .with_page_size(500);
//!
//! let mut reader = Ldap3Reader::open(&config)?;
//! reader.query_attributes(
//!     "(objectClass=user)",
//!     "ou=people,dc=example,dc=com",
//!     &["sAMAccountName", "memberOf"],
//! )?;
//!
//! while reader.fetch()? {
//!     if let Some(names) = reader.get_attribute("sAMAccountName")? {
//!         println!("{:?}", names.to_strings());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`gateway`] - Directory protocol seam and the `ldap3` implementation
//! - [`session`] - Connection handle and bind state
//! - [`query`] - Paging control and cookie continuation
//! - [`cursor`] - Entry iteration across pages
//! - [`attribute`] - Owned attribute values
//! - [`config`] - Reader configuration
//! - [`error`] - Error taxonomy

pub mod attribute;
pub mod config;
pub mod cursor;
pub mod error;
pub mod gateway;
pub mod query;
pub mod reader;
pub mod session;

// Re-exports
pub use attribute::AttributeValues;
pub use config::{ConnectionSettings, ReaderConfig};
pub use error::{GatewayError, GatewayResult, ReaderError, ReaderResult};
pub use gateway::ldap::{Ldap3Connection, Ldap3Gateway};
pub use gateway::{DirectoryConnection, DirectoryGateway, Entry};
pub use query::{PageState, PagedQuery, Query};
pub use reader::{Ldap3Reader, LdapReader};
pub use session::{BindState, Session};

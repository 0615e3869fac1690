//! Directory protocol gateway
//!
//! The reader never talks to the wire directly. Everything it needs from a
//! directory server goes through [`DirectoryGateway`] (connection setup) and
//! [`DirectoryConnection`] (bind, paging controls, search). The `ldap3`
//! backed implementation lives in [`ldap`].

pub mod ldap;

use crate::error::GatewayResult;

/// OID of the simple paged results control (RFC 2696).
pub const PAGED_RESULTS_OID: &str = "1.2.840.113556.1.4.319";

/// Factory for connection handles.
pub trait DirectoryGateway {
    /// Connection handle produced by [`initialize`](Self::initialize).
    type Connection: DirectoryConnection;

    /// Initialize a connection handle for `uri`.
    fn initialize(&self, uri: &str) -> GatewayResult<Self::Connection>;
}

/// Operations available on an initialized connection handle.
///
/// All calls block until the server answers.
pub trait DirectoryConnection {
    /// Negotiate the protocol version.
    fn set_protocol_version(&mut self, version: u32) -> GatewayResult<()>;

    /// Authenticate as `principal`.
    ///
    /// Returns the server credential blob, when the server sent one.
    fn bind(&mut self, principal: &str, secret: &str) -> GatewayResult<Option<Vec<u8>>>;

    /// Encode a paging request control.
    fn create_paging_control(
        &self,
        page_size: u32,
        cookie: &[u8],
        critical: bool,
    ) -> GatewayResult<Control>;

    /// Run a subtree search with no size or time limit.
    ///
    /// A non-success result status is returned as an error.
    fn search(&mut self, request: &SearchRequest<'_>) -> GatewayResult<SearchPage>;

    /// Decode a paged results response control.
    fn parse_paging_response(&self, control: &Control) -> GatewayResult<PageResponse>;

    /// Release the connection.
    fn unbind(&mut self) -> GatewayResult<()>;
}

/// A request or response control in gateway-neutral form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub oid: String,
    pub critical: bool,
    pub value: Option<Vec<u8>>,
}

impl Control {
    pub fn is_paged_results(&self) -> bool {
        self.oid == PAGED_RESULTS_OID
    }
}

/// Decoded paged results response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResponse {
    /// Server's estimate of the total result size. Most servers send 0.
    pub count: u32,
    /// Continuation cookie. Empty when the last page has been sent.
    pub cookie: Vec<u8>,
}

/// One search round trip.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub base: &'a str,
    pub filter: &'a str,
    /// Requested attributes. Empty requests all user attributes.
    pub attributes: &'a [String],
    pub controls: &'a [Control],
}

/// Entries and response controls of one search round trip.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub entries: Vec<Entry>,
    pub controls: Vec<Control>,
}

impl SearchPage {
    /// Find the paged results response control, if the server sent one.
    pub fn paging_control(&self) -> Option<&Control> {
        self.controls.iter().find(|c| c.is_paged_results())
    }
}

/// A directory entry returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    dn: String,
    attributes: Vec<(String, Vec<Vec<u8>>)>,
}

impl Entry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Builder-style attribute insertion, used by gateways and tests.
    #[must_use]
    pub fn with_attribute<V: Into<Vec<u8>>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.push_attribute(name, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn push_attribute(&mut self, name: impl Into<String>, values: Vec<Vec<u8>>) {
        self.attributes.push((name.into(), values));
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Values of `name`, matched ASCII case-insensitively.
    ///
    /// `None` means the entry does not carry the attribute; `Some(&[])`
    /// means it does, with no values.
    pub fn values(&self, name: &str) -> Option<&[Vec<u8>]> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(n, _)| n.as_str())
    }
}

/// Text for an LDAP result code (RFC 4511, section 4.1.9).
pub fn result_code_text(code: u32) -> &'static str {
    match code {
        0 => "Success",
        1 => "Operations error",
        2 => "Protocol error",
        3 => "Time limit exceeded",
        4 => "Size limit exceeded",
        5 => "Compare False",
        6 => "Compare True",
        7 => "Authentication method not supported",
        8 => "Strong(er) authentication required",
        10 => "Referral",
        11 => "Administrative limit exceeded",
        12 => "Critical extension is unavailable",
        13 => "Confidentiality required",
        14 => "SASL bind in progress",
        16 => "No such attribute",
        17 => "Undefined attribute type",
        18 => "Inappropriate matching",
        19 => "Constraint violation",
        20 => "Type or value exists",
        21 => "Invalid syntax",
        32 => "No such object",
        33 => "Alias problem",
        34 => "Invalid DN syntax",
        36 => "Alias dereferencing problem",
        48 => "Inappropriate authentication",
        49 => "Invalid credentials",
        50 => "Insufficient access",
        51 => "Server is busy",
        52 => "Server is unavailable",
        53 => "Server is unwilling to perform",
        54 => "Loop detected",
        64 => "Naming violation",
        65 => "Object class violation",
        66 => "Operation not allowed on non-leaf",
        67 => "Operation not allowed on RDN",
        68 => "Already exists",
        69 => "Cannot modify object class",
        71 => "Affects multiple DSAs",
        80 => "Other (e.g., implementation specific) error",
        _ => "Unknown error",
    }
}

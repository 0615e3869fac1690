//! In-memory directory gateway for integration tests.
//!
//! Serves a fixed list of entries in pages, honoring the page size and
//! cookie carried by the paging control, and records every call.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ldap_reader::gateway::{
    Control, DirectoryConnection, DirectoryGateway, Entry, PageResponse, SearchPage,
    SearchRequest, PAGED_RESULTS_OID,
};
use ldap_reader::{GatewayError, GatewayResult};

/// One recorded search request.
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    pub base: String,
    pub filter: String,
    pub attributes: Vec<String>,
    pub page_size: u32,
    pub cookie: Vec<u8>,
    pub critical: bool,
}

/// Everything the connection was asked to do.
#[derive(Debug, Default)]
pub struct Recorder {
    pub initialized: Vec<String>,
    pub versions: Vec<u32>,
    pub binds: Vec<(String, String)>,
    pub searches: Vec<RecordedSearch>,
    pub unbinds: usize,
}

/// Failure injection knobs.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub initialize: Option<GatewayError>,
    pub version: Option<GatewayError>,
    pub bind: Option<GatewayError>,
    pub control: Option<GatewayError>,
    /// Fail the search with this zero-based call index.
    pub search_at: Option<(usize, GatewayError)>,
    /// Answer searches without a paged results control.
    pub omit_paging_control: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockDirectory {
    pub entries: Vec<Entry>,
    pub faults: Faults,
    pub recorder: Arc<Mutex<Recorder>>,
}

impl MockDirectory {
    /// Directory with `n` entries named `cn=user{i}`.
    pub fn with_users(n: usize) -> Self {
        let entries = (0..n)
            .map(|i| {
                Entry::new(format!("cn=user{i},ou=people,dc=example,dc=com"))
                    .with_attribute("cn", [format!("user{i}")])
                    .with_attribute("objectClass", ["top", "person"])
            })
            .collect();
        Self::with_entries(entries)
    }

    pub fn with_entries(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            ..Default::default()
        }
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.recorder.lock().unwrap().searches.clone()
    }

    pub fn search_count(&self) -> usize {
        self.recorder.lock().unwrap().searches.len()
    }

    pub fn bind_count(&self) -> usize {
        self.recorder.lock().unwrap().binds.len()
    }

    pub fn unbind_count(&self) -> usize {
        self.recorder.lock().unwrap().unbinds
    }
}

impl DirectoryGateway for MockDirectory {
    type Connection = MockConnection;

    fn initialize(&self, uri: &str) -> GatewayResult<MockConnection> {
        if let Some(err) = &self.faults.initialize {
            return Err(err.clone());
        }
        self.recorder
            .lock()
            .unwrap()
            .initialized
            .push(uri.to_string());

        Ok(MockConnection {
            directory: self.clone(),
        })
    }
}

pub struct MockConnection {
    directory: MockDirectory,
}

impl MockConnection {
    fn record<F: FnOnce(&mut Recorder)>(&self, f: F) {
        f(&mut self.directory.recorder.lock().unwrap());
    }
}

// Request control value: 4-byte big-endian page size followed by the cookie.
// Cookies are the decimal offset of the next entry.

impl DirectoryConnection for MockConnection {
    fn set_protocol_version(&mut self, version: u32) -> GatewayResult<()> {
        self.record(|r| r.versions.push(version));
        match &self.directory.faults.version {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn bind(&mut self, principal: &str, secret: &str) -> GatewayResult<Option<Vec<u8>>> {
        self.record(|r| r.binds.push((principal.to_string(), secret.to_string())));
        match &self.directory.faults.bind {
            Some(err) => Err(err.clone()),
            None => Ok(Some(b"server-creds".to_vec())),
        }
    }

    fn create_paging_control(
        &self,
        page_size: u32,
        cookie: &[u8],
        critical: bool,
    ) -> GatewayResult<Control> {
        if let Some(err) = &self.directory.faults.control {
            return Err(err.clone());
        }
        let mut value = page_size.to_be_bytes().to_vec();
        value.extend_from_slice(cookie);
        Ok(Control {
            oid: PAGED_RESULTS_OID.to_string(),
            critical,
            value: Some(value),
        })
    }

    fn search(&mut self, request: &SearchRequest<'_>) -> GatewayResult<SearchPage> {
        let control = request
            .controls
            .iter()
            .find(|c| c.is_paged_results())
            .ok_or_else(|| GatewayError::with_code(2, "Protocol error"))?;
        let value = control.value.clone().unwrap_or_default();
        let (size, cookie) = value.split_at(4);
        let page_size = u32::from_be_bytes([size[0], size[1], size[2], size[3]]);

        let index = self.directory.recorder.lock().unwrap().searches.len();
        self.record(|r| {
            r.searches.push(RecordedSearch {
                base: request.base.to_string(),
                filter: request.filter.to_string(),
                attributes: request.attributes.to_vec(),
                page_size,
                cookie: cookie.to_vec(),
                critical: control.critical,
            })
        });

        if let Some((at, err)) = &self.directory.faults.search_at {
            if *at == index {
                return Err(err.clone());
            }
        }

        let offset: usize = if cookie.is_empty() {
            0
        } else {
            std::str::from_utf8(cookie)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| GatewayError::with_code(53, "Server is unwilling to perform"))?
        };

        let total = self.directory.entries.len();
        let end = (offset + page_size as usize).min(total);
        let entries = self.directory.entries[offset.min(total)..end].to_vec();
        let next_cookie = if end < total {
            end.to_string().into_bytes()
        } else {
            Vec::new()
        };

        let controls = if self.directory.faults.omit_paging_control {
            Vec::new()
        } else {
            let mut value = (total as u32).to_be_bytes().to_vec();
            value.extend_from_slice(&next_cookie);
            vec![Control {
                oid: PAGED_RESULTS_OID.to_string(),
                critical: false,
                value: Some(value),
            }]
        };

        Ok(SearchPage { entries, controls })
    }

    fn parse_paging_response(&self, control: &Control) -> GatewayResult<PageResponse> {
        let value = control
            .value
            .as_deref()
            .filter(|v| v.len() >= 4)
            .ok_or_else(|| GatewayError::with_code(2, "Protocol error"))?;
        let (count, cookie) = value.split_at(4);
        Ok(PageResponse {
            count: u32::from_be_bytes([count[0], count[1], count[2], count[3]]),
            cookie: cookie.to_vec(),
        })
    }

    fn unbind(&mut self) -> GatewayResult<()> {
        self.record(|r| r.unbinds += 1);
        Ok(())
    }
}

pub const URI: &str = "ldap://ldap.example.com";
pub const BIND_DN: &str = "cn=reader,ou=Accounts,dc=example,dc=com";
pub const PASSWORD: &str = "Passw0rd";
pub const BASE: &str = "ou=people,dc=example,dc=com";
pub const FILTER: &str = "(objectClass=person)";

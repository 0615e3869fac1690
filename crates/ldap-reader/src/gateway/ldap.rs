//! `ldap3`-backed gateway
//!
//! Uses the synchronous [`LdapConn`] so every call blocks the caller, which
//! is the reader's execution model.

use ldap3::asn1::{parse_tag, StructureTag, TagClass, Types};
use ldap3::controls::{Control as LdapControl, PagedResults, RawControl};
use ldap3::{LdapConn, LdapConnSettings, LdapError, LdapResult, Scope, SearchEntry, SearchResult};
use tracing::{debug, instrument};

use super::{
    result_code_text, Control, DirectoryConnection, DirectoryGateway, Entry, PageResponse,
    SearchPage, SearchRequest,
};
use crate::config::ConnectionSettings;
use crate::error::{GatewayError, GatewayResult};

/// `ldap3` only implements protocol version 3.
const SUPPORTED_PROTOCOL_VERSION: u32 = 3;

/// Result code reported when the gateway rejects a request locally.
const PROTOCOL_ERROR: u32 = 2;

/// Gateway creating [`Ldap3Connection`] handles.
#[derive(Debug, Clone, Default)]
pub struct Ldap3Gateway {
    settings: ConnectionSettings,
}

impl Ldap3Gateway {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }
}

impl DirectoryGateway for Ldap3Gateway {
    type Connection = Ldap3Connection;

    #[instrument(skip(self))]
    fn initialize(&self, uri: &str) -> GatewayResult<Ldap3Connection> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.settings.connection_timeout())
            .set_starttls(self.settings.starttls)
            .set_no_tls_verify(self.settings.no_tls_verify);

        let conn = LdapConn::with_settings(settings, uri).map_err(map_ldap_error)?;
        debug!("LDAP connection initialized");

        Ok(Ldap3Connection { conn })
    }
}

/// Connection handle wrapping a synchronous `ldap3` connection.
pub struct Ldap3Connection {
    conn: LdapConn,
}

impl std::fmt::Debug for Ldap3Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ldap3Connection").finish_non_exhaustive()
    }
}

impl DirectoryConnection for Ldap3Connection {
    fn set_protocol_version(&mut self, version: u32) -> GatewayResult<()> {
        if version == SUPPORTED_PROTOCOL_VERSION {
            Ok(())
        } else {
            Err(GatewayError::with_code(
                PROTOCOL_ERROR,
                format!(
                    "{}: unsupported protocol version {version}",
                    result_code_text(PROTOCOL_ERROR)
                ),
            ))
        }
    }

    #[instrument(skip(self, secret))]
    fn bind(&mut self, principal: &str, secret: &str) -> GatewayResult<Option<Vec<u8>>> {
        let result = self
            .conn
            .simple_bind(principal, secret)
            .map_err(map_ldap_error)?;
        check_result(&result)?;

        // Simple binds carry no server credentials.
        Ok(None)
    }

    fn create_paging_control(
        &self,
        page_size: u32,
        cookie: &[u8],
        critical: bool,
    ) -> GatewayResult<Control> {
        let size = i32::try_from(page_size).map_err(|_| {
            GatewayError::with_code(
                PROTOCOL_ERROR,
                format!("page size {page_size} does not fit the paging control"),
            )
        })?;

        let raw: RawControl = PagedResults {
            size,
            cookie: cookie.to_vec(),
        }
        .into();

        Ok(Control {
            oid: raw.ctype,
            critical,
            value: raw.val,
        })
    }

    #[instrument(skip(self, request), fields(base = %request.base, filter = %request.filter))]
    fn search(&mut self, request: &SearchRequest<'_>) -> GatewayResult<SearchPage> {
        let controls: Vec<RawControl> = request
            .controls
            .iter()
            .map(|c| RawControl {
                ctype: c.oid.clone(),
                crit: c.critical,
                val: c.value.clone(),
            })
            .collect();

        let SearchResult(results, status) = self
            .conn
            .with_controls(controls)
            .search(
                request.base,
                Scope::Subtree,
                request.filter,
                request.attributes,
            )
            .map_err(map_ldap_error)?;
        check_result(&status)?;

        let entries: Vec<Entry> = results
            .into_iter()
            .filter(|r| !r.is_ref() && !r.is_intermediate())
            .map(SearchEntry::construct)
            .map(entry_from_search)
            .collect();

        debug!(entries = entries.len(), "LDAP search page received");

        Ok(SearchPage {
            entries,
            controls: status
                .ctrls
                .into_iter()
                .map(|LdapControl(_, raw)| Control {
                    oid: raw.ctype,
                    critical: raw.crit,
                    value: raw.val,
                })
                .collect(),
        })
    }

    fn parse_paging_response(&self, control: &Control) -> GatewayResult<PageResponse> {
        let value = control.value.as_deref().ok_or_else(|| {
            GatewayError::with_code(PROTOCOL_ERROR, "paging control carries no value")
        })?;
        decode_paged_results(value)
    }

    fn unbind(&mut self) -> GatewayResult<()> {
        self.conn.unbind().map_err(map_ldap_error)
    }
}

fn check_result(result: &LdapResult) -> GatewayResult<()> {
    if result.rc == 0 {
        return Ok(());
    }

    let text = result_code_text(result.rc);
    let message = if result.text.is_empty() {
        text.to_string()
    } else {
        format!("{}: {}", text, result.text)
    };
    Err(GatewayError::with_code(result.rc, message))
}

fn map_ldap_error(err: LdapError) -> GatewayError {
    match err {
        LdapError::LdapResult { result } => match check_result(&result) {
            Err(e) => e,
            Ok(()) => GatewayError::new(result_code_text(0)),
        },
        other => GatewayError::new(other.to_string()),
    }
}

/// Flatten an `ldap3` entry. Attributes are sorted by name because `ldap3`
/// hands them over in hash order; value order is preserved.
fn entry_from_search(search: SearchEntry) -> Entry {
    let mut attributes: Vec<(String, Vec<Vec<u8>>)> = search
        .attrs
        .into_iter()
        .map(|(name, values)| (name, values.into_iter().map(String::into_bytes).collect()))
        .chain(search.bin_attrs)
        .collect();
    attributes.sort_by(|a, b| a.0.cmp(&b.0));

    let mut entry = Entry::new(search.dn);
    for (name, values) in attributes {
        entry.push_attribute(name, values);
    }
    entry
}

/// Decode a paged results response value (RFC 2696):
/// `SEQUENCE { size INTEGER, cookie OCTET STRING }`.
///
/// `ldap3`'s `PagedResults` parser panics on malformed input, so the value
/// goes through the non-panicking `asn1` layer and malformed controls
/// become protocol errors.
fn decode_paged_results(value: &[u8]) -> GatewayResult<PageResponse> {
    let (rest, tag) = parse_tag(value).map_err(|_| malformed("not a BER value"))?;
    if !rest.is_empty() {
        return Err(malformed("trailing data after control value"));
    }

    let mut components = universal(tag, Types::Sequence)
        .and_then(StructureTag::expect_constructed)
        .ok_or_else(|| malformed("expected a sequence"))?
        .into_iter();

    let (Some(size), Some(cookie), None) =
        (components.next(), components.next(), components.next())
    else {
        return Err(malformed("expected size and cookie"));
    };

    let size = universal(size, Types::Integer)
        .and_then(StructureTag::expect_primitive)
        .ok_or_else(|| malformed("invalid size field"))?;
    let cookie = universal(cookie, Types::OctetString)
        .and_then(StructureTag::expect_primitive)
        .ok_or_else(|| malformed("invalid cookie"))?;

    Ok(PageResponse {
        count: decode_count(&size)?,
        cookie,
    })
}

fn universal(tag: StructureTag, id: Types) -> Option<StructureTag> {
    tag.match_class(TagClass::Universal)
        .and_then(|t| t.match_id(id as u64))
}

/// Negative estimates are reported as 0.
fn decode_count(bytes: &[u8]) -> GatewayResult<u32> {
    if bytes.is_empty() || bytes.len() > 5 {
        return Err(malformed("invalid size field"));
    }
    let negative = bytes[0] & 0x80 != 0;
    let mut value: i64 = if negative { -1 } else { 0 };
    for b in bytes {
        value = (value << 8) | i64::from(*b);
    }
    Ok(u32::try_from(value.max(0)).unwrap_or(u32::MAX))
}

fn malformed(detail: impl std::fmt::Display) -> GatewayError {
    GatewayError::with_code(
        PROTOCOL_ERROR,
        format!("malformed paged results control: {detail}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_paged_results_with_cookie() {
        let value = [
            0x30, 0x0a, 0x02, 0x02, 0x09, 0xc4, 0x04, 0x04, b'a', b'b', b'c', b'd',
        ];

        let response = decode_paged_results(&value).unwrap();
        assert_eq!(response.count, 2500);
        assert_eq!(response.cookie, b"abcd");
    }

    #[test]
    fn test_decode_paged_results_last_page() {
        let value = [0x30, 0x05, 0x02, 0x01, 0x00, 0x04, 0x00];

        let response = decode_paged_results(&value).unwrap();
        assert_eq!(response, PageResponse::default());
    }

    #[test]
    fn test_decode_paged_results_long_form_length() {
        let cookie = vec![0x5a; 200];
        let mut value = vec![0x30, 0x81, 0xce, 0x02, 0x01, 0x07, 0x04, 0x81, 0xc8];
        value.extend_from_slice(&cookie);

        let response = decode_paged_results(&value).unwrap();
        assert_eq!(response.count, 7);
        assert_eq!(response.cookie, cookie);
    }

    #[test]
    fn test_decode_paged_results_negative_count() {
        let value = [0x30, 0x05, 0x02, 0x01, 0xff, 0x04, 0x00];

        assert_eq!(decode_paged_results(&value).unwrap().count, 0);
    }

    #[test]
    fn test_decode_paged_results_rejects_malformed() {
        // Truncated cookie
        let truncated = [0x30, 0x07, 0x02, 0x01, 0x00, 0x04, 0x05, b'a'];
        assert!(decode_paged_results(&truncated).is_err());

        // Wrong outer tag
        let not_sequence = [0x31, 0x05, 0x02, 0x01, 0x00, 0x04, 0x00];
        assert!(decode_paged_results(&not_sequence).is_err());

        // Empty value
        assert!(decode_paged_results(&[]).is_err());

        // Trailing bytes after the sequence
        let trailing = [0x30, 0x05, 0x02, 0x01, 0x00, 0x04, 0x00, 0x00];
        assert!(decode_paged_results(&trailing).is_err());

        // Cookie missing from the sequence
        let short = [0x30, 0x03, 0x02, 0x01, 0x00];
        assert!(decode_paged_results(&short).is_err());

        let err = decode_paged_results(&[0x30]).unwrap_err();
        assert_eq!(err.code, Some(PROTOCOL_ERROR));
        assert!(err.message.starts_with("malformed paged results control"));
    }

    #[test]
    fn test_create_paging_control_matches_decoder() {
        // The request and response share the same value layout.
        let raw: RawControl = PagedResults {
            size: 1000,
            cookie: b"next".to_vec(),
        }
        .into();

        assert_eq!(raw.ctype, crate::gateway::PAGED_RESULTS_OID);
        let decoded = decode_paged_results(raw.val.as_deref().unwrap()).unwrap();
        assert_eq!(decoded.count, 1000);
        assert_eq!(decoded.cookie, b"next");
    }

    #[test]
    fn test_entry_from_search_merges_binary_attributes() {
        let mut search = SearchEntry {
            dn: "cn=jdoe,dc=example,dc=com".to_string(),
            attrs: Default::default(),
            bin_attrs: Default::default(),
        };
        search
            .attrs
            .insert("cn".to_string(), vec!["jdoe".to_string()]);
        search
            .bin_attrs
            .insert("objectGUID".to_string(), vec![vec![0x01, 0x02, 0xff]]);

        let entry = entry_from_search(search);
        assert_eq!(entry.dn(), "cn=jdoe,dc=example,dc=com");
        assert_eq!(entry.values("cn").unwrap()[0], b"jdoe");
        assert_eq!(entry.values("objectguid").unwrap()[0], vec![0x01, 0x02, 0xff]);
    }

    #[test]
    fn test_check_result_uses_result_code_text() {
        let result = LdapResult {
            rc: 32,
            matched: String::new(),
            text: "ou=missing".to_string(),
            refs: vec![],
            ctrls: vec![],
        };

        let err = check_result(&result).unwrap_err();
        assert_eq!(err.code, Some(32));
        assert_eq!(err.message, "No such object: ou=missing");
    }
}

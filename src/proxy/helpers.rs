//! Proxy utility functions.
//!
//! This module contains helper functions for request processing:
//! - Header extraction from Pingora requests
//! - Query parameter parsing
//! - Client identifier detection (edge header aware)

use std::collections::HashMap;
use std::net::IpAddr;

use pingora_http::RequestHeader;
use pingora_proxy::Session;

/// Extract headers from Pingora RequestHeader into HashMap.
///
/// Converts all headers to string key-value pairs. Headers with non-UTF8
/// values are skipped.
pub fn extract_headers(req: &RequestHeader) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for (name, value) in req.headers.iter() {
        if let Ok(value_str) = value.to_str() {
            headers.insert(name.to_string(), value_str.to_string());
        }
    }
    headers
}

/// Extract query parameters from URI.
///
/// Keys and values are URL-decoded, with `+` read as a space. When a key
/// repeats, the first occurrence wins. Pairs without `=` are skipped.
pub fn extract_query_params(req: &RequestHeader) -> HashMap<String, String> {
    req.uri.query().map(parse_query).unwrap_or_default()
}

/// Parse a raw query string (without the leading `?`)
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            params
                .entry(decode_component(key))
                .or_insert_with(|| decode_component(value));
        }
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

/// Resolve the identifier the rate limiter counts against.
///
/// The configured header (e.g. `cf-connecting-ip`) wins; if it carries a
/// list (`"client, proxy1"`), the first entry is used. Without the header
/// the peer IP is used, port stripped. `None` when neither is available.
pub fn client_identifier(
    headers: &HashMap<String, String>,
    header_name: &str,
    peer_ip: Option<IpAddr>,
) -> Option<String> {
    let from_header = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(header_name))
        .and_then(|(_, value)| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    from_header.or_else(|| peer_ip.map(|ip| ip.to_string()))
}

/// IP address of the directly connected peer, if it is an inet socket
pub fn peer_ip(session: &Session) -> Option<IpAddr> {
    session
        .client_addr()
        .and_then(|addr| addr.as_inet())
        .map(|inet| inet.ip())
}

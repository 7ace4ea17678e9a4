//! Extraction of client credentials and bearer tokens from the three
//! carriers the specification recognizes: the `Authorization` header (and
//! two common proxy-header variants), the form-encoded body, and the query
//! string.
use std::collections::HashMap;

use http::HeaderMap;

/// Credentials recovered from an `Authorization`-style header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Credentials {
    /// HTTP Basic: `client_id` and `client_secret`.
    Basic { client_id: String, client_secret: Vec<u8> },
    /// A bearer token, presented via `OAuth` or `Bearer` scheme.
    Bearer(String),
    /// No recognizable header was present.
    None,
}

const HEADER_NAMES: [&str; 3] = ["authorization", "x-authorization", "proxy-authorization"];

/// Parse whichever of the recognized header names is present into
/// [`Credentials`]. The first matching header wins.
pub fn credentials(headers: &HeaderMap) -> Credentials {
    for name in HEADER_NAMES {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            if let Some(credentials) = parse_header(value) {
                return credentials;
            }
        }
    }
    Credentials::None
}

fn parse_header(value: &str) -> Option<Credentials> {
    if let Some(encoded) = value.strip_prefix("Basic ") {
        return decode_basic(encoded);
    }
    if let Some(token) = value.strip_prefix("OAuth ").or_else(|| value.strip_prefix("Bearer ")) {
        return Some(Credentials::Bearer(token.trim().to_string()));
    }
    None
}

fn decode_basic(encoded: &str) -> Option<Credentials> {
    let decoded = base64::decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let mut parts = text.splitn(2, ':');
    let client_id = parts.next()?.to_string();
    let client_secret = parts.next()?.as_bytes().to_vec();
    Some(Credentials::Basic { client_id, client_secret })
}

/// Decode a `x-www-form-urlencoded` byte string (a body or a query string)
/// into a flat parameter map. Later occurrences of a key win.
pub fn parse_params(encoded: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(encoded)
        .into_owned()
        .collect()
}

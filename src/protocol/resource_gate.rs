//! Bearer-token extraction, validation, and `WWW-Authenticate` challenge
//! construction for protected resources.
use std::collections::HashMap;

use crate::error::{ResourceError, ResourceErrorKind};
use crate::primitives::store::{AccessToken, TokenStore};

use super::decoder::Credentials;

/// Recover a bearer token from whichever carrier presents one: the
/// `Authorization` header first, then the `oauth_token` form/query
/// parameter.
pub fn extract_bearer_token(
    header_credentials: &Credentials, body_params: &HashMap<String, String>, query_params: &HashMap<String, String>,
) -> Option<String> {
    if let Credentials::Bearer(token) = header_credentials {
        return Some(token.clone());
    }
    body_params
        .get("oauth_token")
        .or_else(|| query_params.get("oauth_token"))
        .cloned()
}

/// Validate a presented token: it must exist, be unrevoked, and be
/// unexpired.
pub fn validate_token(tokens: &dyn TokenStore, token: &str) -> Result<AccessToken, ResourceError> {
    let token = tokens
        .find(token)
        .ok_or_else(|| ResourceError::with_description(ResourceErrorKind::InvalidToken, "token not recognized"))?;

    if token.is_revoked() {
        return Err(ResourceError::with_description(ResourceErrorKind::InvalidToken, "token has been revoked"));
    }
    if token.is_expired() {
        return Err(ResourceError::with_description(ResourceErrorKind::ExpiredToken, "token has expired"));
    }
    Ok(token)
}

/// Build a `WWW-Authenticate` challenge: `OAuth realm="..."`, optionally
/// followed by `error`/`error_description`, optionally followed by
/// `scope`.
pub fn challenge_header(realm: &str, error: Option<&ResourceError>, scope: Option<&str>) -> String {
    let mut header = format!("OAuth realm=\"{}\"", realm);
    if let Some(error) = error {
        header.push_str(&format!(", error=\"{}\"", error.code()));
        if let Some(description) = error.description() {
            header.push_str(&format!(", error_description=\"{}\"", description));
        }
    }
    if let Some(scope) = scope {
        if !scope.is_empty() {
            header.push_str(&format!(", scope=\"{}\"", scope));
        }
    }
    header
}

/// Normalize the host application's `oauth.no_scope` signal, which may
/// arrive as a single scope name or a comma-joined list, into a
/// space-joined scope string.
pub fn normalize_no_scope(raw: &str) -> String {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::store::MemoryTokenStore;

    #[test]
    fn extracts_bearer_from_header_over_params() {
        let creds = Credentials::Bearer("abc".into());
        let token = extract_bearer_token(&creds, &HashMap::new(), &HashMap::new());
        assert_eq!(token.as_deref(), Some("abc"));
    }

    #[test]
    fn extracts_bearer_from_query_when_no_header() {
        let mut query = HashMap::new();
        query.insert("oauth_token".into(), "xyz".into());
        let token = extract_bearer_token(&Credentials::None, &HashMap::new(), &query);
        assert_eq!(token.as_deref(), Some("xyz"));
    }

    #[test]
    fn unknown_token_is_invalid() {
        let store = MemoryTokenStore::new();
        let err = validate_token(&store, "nonexistent").unwrap_err();
        assert_eq!(err.code(), "invalid_token");
    }

    #[test]
    fn token_lookup_is_case_insensitive() {
        let store = MemoryTokenStore::new();
        let token = store.issue("alice", "uberclient", "read".parse().unwrap(), None);
        assert!(validate_token(&store, &token.token().to_uppercase()).is_ok());
    }

    #[test]
    fn challenge_header_format_matches_specification() {
        let err = ResourceError::with_description(ResourceErrorKind::InsufficientScope, "need more scope");
        let header = challenge_header("example", Some(&err), Some("read write"));
        assert_eq!(
            header,
            "OAuth realm=\"example\", error=\"insufficient_scope\", error_description=\"need more scope\", scope=\"read write\""
        );
    }

    #[test]
    fn bare_challenge_has_no_error_or_scope() {
        let header = challenge_header("example", None, None);
        assert_eq!(header, "OAuth realm=\"example\"");
    }

    #[test]
    fn normalize_no_scope_handles_comma_and_space() {
        assert_eq!(normalize_no_scope("read, write"), "read write");
        assert_eq!(normalize_no_scope("read"), "read");
    }
}

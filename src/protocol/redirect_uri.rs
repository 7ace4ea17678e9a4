//! Validation of client-supplied redirect URIs.
use url::Url;

use crate::error::{AuthorizationError, AuthorizationErrorKind};

/// Parse and validate a redirect URI: it must be absolute, carry a
/// hierarchical authority (a host), and must not contain a fragment.
///
/// This is the one authorize-time failure the specification reports as a
/// bare 400 rather than a redirect, since there is no trustworthy target
/// to redirect an error to.
pub fn parse_redirect_uri(raw: Option<&str>) -> Result<Url, AuthorizationError> {
    let raw = raw.ok_or_else(|| {
        AuthorizationError::with_description(AuthorizationErrorKind::InvalidRequest, "missing redirect_uri")
    })?;

    let url = Url::parse(raw).map_err(|_| {
        AuthorizationError::with_description(AuthorizationErrorKind::InvalidRequest, "redirect_uri is not a valid URI")
    })?;

    if url.cannot_be_a_base() {
        return Err(AuthorizationError::with_description(
            AuthorizationErrorKind::InvalidRequest,
            "redirect_uri has no hierarchical authority",
        ));
    }

    if url.fragment().is_some() {
        return Err(AuthorizationError::with_description(
            AuthorizationErrorKind::InvalidRequest,
            "redirect_uri must not contain a fragment",
        ));
    }

    Ok(url)
}

/// Append `error`/`error_description`/`state` to a redirect URI's query
/// string, used for every authorize-time failure that *is* redirect-safe.
pub fn append_error(base: &Url, code: &str, description: Option<&str>, state: Option<&str>) -> Url {
    let mut url = base.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("error", code);
        if let Some(description) = description {
            pairs.append_pair("error_description", description);
        }
        if let Some(state) = state {
            pairs.append_pair("state", state);
        }
    }
    url
}

/// Append grant parameters to a redirect URI's query string, used for the
/// `code` response type.
pub fn append_query_grant(base: &Url, code: &str, scope: &str, state: Option<&str>) -> Url {
    let mut url = base.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("code", code);
        if !scope.is_empty() {
            pairs.append_pair("scope", scope);
        }
        if let Some(state) = state {
            pairs.append_pair("state", state);
        }
    }
    url
}

/// Append grant parameters to a redirect URI's fragment, used for the
/// `token` response type.
pub fn append_fragment_grant(base: &Url, access_token: &str, scope: &str, state: Option<&str>) -> Url {
    let mut url = base.clone();
    let mut fragment = format!("access_token={}", access_token);
    if !scope.is_empty() {
        fragment.push_str(&format!("&scope={}", url_escape(scope)));
    }
    if let Some(state) = state {
        fragment.push_str(&format!("&state={}", url_escape(state)));
    }
    url.set_fragment(Some(&fragment));
    url
}

fn url_escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_hierarchical_uri() {
        let url = parse_redirect_uri(Some("http://uberclient.dot/callback")).unwrap();
        assert_eq!(url.host_str(), Some("uberclient.dot"));
    }

    #[test]
    fn rejects_missing_uri() {
        assert!(parse_redirect_uri(None).is_err());
    }

    #[test]
    fn rejects_non_hierarchical_uri() {
        assert!(parse_redirect_uri(Some("mailto:nobody@example.com")).is_err());
    }

    #[test]
    fn rejects_fragment() {
        assert!(parse_redirect_uri(Some("http://uberclient.dot/callback#frag")).is_err());
    }

    #[test]
    fn rejects_malformed_uri() {
        assert!(parse_redirect_uri(Some("http:not-valid")).is_err());
    }

    #[test]
    fn query_grant_preserves_existing_params() {
        let base = Url::parse("http://uberclient.dot/callback?existing=1").unwrap();
        let url = append_query_grant(&base, "abc", "read write", Some("xyz"));
        assert_eq!(url.as_str(), "http://uberclient.dot/callback?existing=1&code=abc&scope=read+write&state=xyz");
    }

    #[test]
    fn fragment_grant_uses_fragment_not_query() {
        let base = Url::parse("http://uberclient.dot/callback").unwrap();
        let url = append_fragment_grant(&base, "abc", "read write", Some("xyz"));
        assert!(url.query().is_none());
        assert_eq!(url.fragment(), Some("access_token=abc&scope=read+write&state=xyz"));
    }
}

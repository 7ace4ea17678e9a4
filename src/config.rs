//! Middleware configuration.
use chrono::Duration;

use crate::primitives::store::ResponseType;

/// Authenticates resource-owner credentials for the password grant.
///
/// Returns the resolved resource identifier on success.
pub trait Authenticator: Send + Sync {
    /// Verify `username`/`password`, returning the resource id they
    /// authenticate as, or `None` if the credentials are rejected.
    fn authenticate(&self, username: &str, password: &str) -> Option<String>;
}

impl<F> Authenticator for F
where
    F: Fn(&str, &str) -> Option<String> + Send + Sync,
{
    fn authenticate(&self, username: &str, password: &str) -> Option<String> {
        self(username, password)
    }
}

/// Configuration for the middleware, covering the endpoint paths, which
/// authorize-endpoint response types are enabled, the optional password
/// grant authenticator, the `WWW-Authenticate` realm, an optional scope
/// allow-list, and how long authorization requests remain redeemable.
pub struct Config {
    authorize_path: String,
    access_token_path: String,
    authorization_types: Vec<ResponseType>,
    authenticator: Option<Box<dyn Authenticator>>,
    realm: Option<String>,
    scopes: Option<Vec<String>>,
    auth_request_ttl: Duration,
}

impl Config {
    /// Override the authorize endpoint path.
    pub fn with_authorize_path(mut self, path: impl Into<String>) -> Self {
        self.authorize_path = path.into();
        self
    }

    /// Override the token endpoint path.
    pub fn with_access_token_path(mut self, path: impl Into<String>) -> Self {
        self.access_token_path = path.into();
        self
    }

    /// Restrict which `response_type` values the authorize endpoint accepts.
    pub fn with_authorization_types(mut self, types: Vec<ResponseType>) -> Self {
        self.authorization_types = types;
        self
    }

    /// Enable the password grant with the given authenticator.
    pub fn with_authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Box::new(authenticator));
        self
    }

    /// Set the realm reported in `WWW-Authenticate` challenges.
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Restrict accepted scope tokens to this allow-list.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Override how long an authorization request remains redeemable by
    /// the host application's consent response.
    pub fn with_auth_request_ttl(mut self, ttl: Duration) -> Self {
        self.auth_request_ttl = ttl;
        self
    }

    pub fn authorize_path(&self) -> &str {
        &self.authorize_path
    }

    pub fn access_token_path(&self) -> &str {
        &self.access_token_path
    }

    pub fn authorization_types(&self) -> &[ResponseType] {
        &self.authorization_types
    }

    pub fn authenticator(&self) -> Option<&dyn Authenticator> {
        self.authenticator.as_deref()
    }

    pub fn realm(&self, fallback_host: &str) -> String {
        self.realm.clone().unwrap_or_else(|| fallback_host.to_string())
    }

    pub fn scopes(&self) -> Option<&[String]> {
        self.scopes.as_deref()
    }

    pub fn auth_request_ttl(&self) -> Duration {
        self.auth_request_ttl
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            authorize_path: "/oauth/authorize".to_string(),
            access_token_path: "/oauth/access_token".to_string(),
            authorization_types: vec![ResponseType::Code, ResponseType::Token],
            authenticator: None,
            realm: None,
            scopes: None,
            auth_request_ttl: Duration::minutes(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_specification() {
        let config = Config::default();
        assert_eq!(config.authorize_path(), "/oauth/authorize");
        assert_eq!(config.access_token_path(), "/oauth/access_token");
        assert_eq!(config.authorization_types().len(), 2);
        assert!(config.authenticator().is_none());
        assert_eq!(config.auth_request_ttl(), Duration::minutes(10));
    }

    #[test]
    fn builder_overrides_apply() {
        let config = Config::default()
            .with_realm("example")
            .with_scopes(vec!["read".into()]);
        assert_eq!(config.realm("fallback.example"), "example");
        assert_eq!(config.scopes(), Some(&["read".to_string()][..]));
    }
}

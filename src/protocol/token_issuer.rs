//! The token endpoint: the authorization-code and password grants.
use std::collections::HashMap;

use crate::config::Config;
use crate::error::{AccessTokenError, AccessTokenErrorKind};
use crate::primitives::registrar::Registrar;
use crate::primitives::scope::Scope;
use crate::primitives::store::{GrantStore, TokenStore};

use super::decoder::Credentials;

/// A finished token-endpoint response: a status code and a JSON body,
/// always with `Cache-Control: no-store`.
pub struct TokenResponse {
    pub status: u16,
    pub body: serde_json::Value,
    /// Present only on a 401, to populate `WWW-Authenticate`.
    pub challenge_realm: Option<String>,
}

impl TokenResponse {
    fn success(access_token: &str, scope: &Scope) -> Self {
        let mut body = serde_json::json!({ "access_token": access_token });
        if !scope.is_empty() {
            body["scope"] = serde_json::Value::String(scope.to_string());
        }
        TokenResponse {
            status: 200,
            body,
            challenge_realm: None,
        }
    }

    fn error(error: &AccessTokenError) -> Self {
        TokenResponse {
            status: 400,
            body: error.to_json(),
            challenge_realm: None,
        }
    }

    fn unauthorized(error: &AccessTokenError, realm: String) -> Self {
        TokenResponse {
            status: 401,
            body: error.to_json(),
            challenge_realm: Some(realm),
        }
    }
}

/// Resolve the client for a token request, preferring HTTP Basic, then the
/// form body, then the query string, per the specification's credential
/// precedence.
fn resolve_client_params<'a>(
    credentials: &'a Credentials, body_params: &'a HashMap<String, String>, query_params: &'a HashMap<String, String>,
) -> (bool, Option<&'a str>, Option<Vec<u8>>) {
    if let Credentials::Basic { client_id, client_secret } = credentials {
        return (true, Some(client_id.as_str()), Some(client_secret.clone()));
    }
    if let Some(id) = body_params.get("client_id") {
        let secret = body_params.get("client_secret").map(|s| s.as_bytes().to_vec());
        return (false, Some(id.as_str()), secret);
    }
    let id = query_params.get("client_id").map(String::as_str);
    let secret = query_params.get("client_secret").map(|s| s.as_bytes().to_vec());
    (false, id, secret)
}

/// Handle a `POST` to the token endpoint. `body_params` and `query_params`
/// are pre-decoded form/query parameter maps.
pub fn issue_token(
    registrar: &dyn Registrar, grants: &dyn GrantStore, tokens: &dyn TokenStore, config: &Config,
    credentials: Credentials, body_params: &HashMap<String, String>, query_params: &HashMap<String, String>,
    realm_fallback: &str,
) -> TokenResponse {
    let (is_basic, client_id, client_secret) = resolve_client_params(&credentials, body_params, query_params);

    let client = match (client_id, client_secret) {
        (Some(id), Some(secret)) => registrar.resolve(id, Some(&secret)),
        _ => Err(crate::error::RegistrarError::Unspecified),
    };

    let client = match client {
        Ok(client) => client,
        Err(_) => {
            let error = AccessTokenError::new(AccessTokenErrorKind::InvalidClient);
            return if is_basic {
                TokenResponse::unauthorized(&error, config.realm(realm_fallback))
            } else {
                TokenResponse::error(&error)
            };
        }
    };

    match body_params.get("grant_type").map(String::as_str) {
        Some("authorization_code") => authorization_code_grant(grants, tokens, client.id(), body_params),
        Some("password") => password_grant(tokens, config, client.id(), body_params),
        _ => TokenResponse::error(&AccessTokenError::with_description(
            AccessTokenErrorKind::UnsupportedGrantType,
            "grant_type must be authorization_code or password",
        )),
    }
}

fn authorization_code_grant(
    grants: &dyn GrantStore, tokens: &dyn TokenStore, client_id: &str, body_params: &HashMap<String, String>,
) -> TokenResponse {
    let code = match body_params.get("code") {
        Some(code) => code,
        None => return TokenResponse::error(&AccessTokenError::new(AccessTokenErrorKind::InvalidGrant)),
    };

    let grant = match grants.redeem(code) {
        Some(grant) => grant,
        None => return TokenResponse::error(&AccessTokenError::new(AccessTokenErrorKind::InvalidGrant)),
    };

    if grant.client_id() != client_id {
        return TokenResponse::error(&AccessTokenError::new(AccessTokenErrorKind::InvalidGrant));
    }

    if !grant.redirect_uri().is_empty() {
        match body_params.get("redirect_uri") {
            Some(supplied) if supplied == grant.redirect_uri() => {}
            _ => return TokenResponse::error(&AccessTokenError::new(AccessTokenErrorKind::InvalidGrant)),
        }
    }

    let token = tokens.issue(grant.resource(), client_id, grant.scope().clone(), None);
    TokenResponse::success(token.token(), token.scope())
}

fn password_grant(tokens: &dyn TokenStore, config: &Config, client_id: &str, body_params: &HashMap<String, String>) -> TokenResponse {
    let authenticator = match config.authenticator() {
        Some(authenticator) => authenticator,
        None => return TokenResponse::error(&AccessTokenError::new(AccessTokenErrorKind::UnsupportedGrantType)),
    };

    let (username, password) = match (body_params.get("username"), body_params.get("password")) {
        (Some(u), Some(p)) => (u, p),
        _ => return TokenResponse::error(&AccessTokenError::new(AccessTokenErrorKind::InvalidGrant)),
    };

    let scope: Scope = match body_params.get("scope").map(String::as_str).unwrap_or("").parse() {
        Ok(scope) => scope,
        Err(_) => return TokenResponse::error(&AccessTokenError::new(AccessTokenErrorKind::InvalidScope)),
    };

    if let Some(allowed) = config.scopes() {
        if !scope.is_subset_of(allowed) {
            return TokenResponse::error(&AccessTokenError::new(AccessTokenErrorKind::InvalidScope));
        }
    }

    let resource = match authenticator.authenticate(username, password) {
        Some(resource) => resource,
        None => return TokenResponse::error(&AccessTokenError::new(AccessTokenErrorKind::InvalidGrant)),
    };

    let token = tokens.get_token_for(&resource, client_id, &scope);
    TokenResponse::success(token.token(), token.scope())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::registrar::{Client, ClientMap};
    use crate::primitives::store::{MemoryGrantStore, MemoryTokenStore};

    fn registrar() -> ClientMap {
        let map = ClientMap::new();
        map.register_client(Client::new("uberclient", b"secret".to_vec(), "UberClient"));
        map
    }

    #[test]
    fn authorization_code_grant_succeeds_once() {
        let reg = registrar();
        let grants = MemoryGrantStore::new();
        let tokens = MemoryTokenStore::new();
        let config = Config::default();
        let scope: Scope = "read write".parse().unwrap();
        let grant = grants.create("uberclient", scope, String::new(), "alice".into());

        let mut body = HashMap::new();
        body.insert("grant_type".into(), "authorization_code".into());
        body.insert("code".into(), grant.code().to_string());

        let creds = Credentials::Basic {
            client_id: "uberclient".into(),
            client_secret: b"secret".to_vec(),
        };
        let response = issue_token(&reg, &grants, &tokens, &config, creds.clone(), &body, &HashMap::new(), "host");
        assert_eq!(response.status, 200);
        assert_eq!(response.body["scope"], "read write");

        let second = issue_token(&reg, &grants, &tokens, &config, creds, &body, &HashMap::new(), "host");
        assert_eq!(second.status, 400);
        assert_eq!(second.body["error"], "invalid_grant");
    }

    #[test]
    fn basic_auth_failure_yields_401_with_challenge() {
        let reg = registrar();
        let grants = MemoryGrantStore::new();
        let tokens = MemoryTokenStore::new();
        let config = Config::default();

        let creds = Credentials::Basic {
            client_id: "uberclient".into(),
            client_secret: b"wrong".to_vec(),
        };
        let response = issue_token(&reg, &grants, &tokens, &config, creds, &HashMap::new(), &HashMap::new(), "host");
        assert_eq!(response.status, 401);
        assert!(response.challenge_realm.is_some());
    }

    #[test]
    fn body_auth_failure_yields_400_without_challenge() {
        let reg = registrar();
        let grants = MemoryGrantStore::new();
        let tokens = MemoryTokenStore::new();
        let config = Config::default();

        let mut body = HashMap::new();
        body.insert("client_id".into(), "uberclient".into());
        body.insert("client_secret".into(), "wrong".into());

        let response = issue_token(&reg, &grants, &tokens, &config, Credentials::None, &body, &HashMap::new(), "host");
        assert_eq!(response.status, 400);
        assert!(response.challenge_realm.is_none());
    }

    #[test]
    fn password_grant_requires_configured_authenticator() {
        let reg = registrar();
        let grants = MemoryGrantStore::new();
        let tokens = MemoryTokenStore::new();
        let config = Config::default();

        let mut body = HashMap::new();
        body.insert("grant_type".into(), "password".into());
        body.insert("username".into(), "alice".into());
        body.insert("password".into(), "hunter2".into());

        let creds = Credentials::Basic {
            client_id: "uberclient".into(),
            client_secret: b"secret".to_vec(),
        };
        let response = issue_token(&reg, &grants, &tokens, &config, creds, &body, &HashMap::new(), "host");
        assert_eq!(response.body["error"], "unsupported_grant_type");
    }

    #[test]
    fn password_grant_is_idempotent_for_same_user_scope_client() {
        let reg = registrar();
        let grants = MemoryGrantStore::new();
        let tokens = MemoryTokenStore::new();
        let config = Config::default().with_authenticator(|u: &str, p: &str| (p == "hunter2").then(|| u.to_string()));

        let mut body = HashMap::new();
        body.insert("grant_type".into(), "password".into());
        body.insert("username".into(), "alice".into());
        body.insert("password".into(), "hunter2".into());

        let creds = Credentials::Basic {
            client_id: "uberclient".into(),
            client_secret: b"secret".to_vec(),
        };
        let first = issue_token(&reg, &grants, &tokens, &config, creds.clone(), &body, &HashMap::new(), "host");
        let second = issue_token(&reg, &grants, &tokens, &config, creds, &body, &HashMap::new(), "host");
        assert_eq!(first.body["access_token"], second.body["access_token"]);
    }
}

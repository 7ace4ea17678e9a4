//! Client registration and resolution.
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::RegistrarError;

/// A registered third-party application.
#[derive(Clone, Debug)]
pub struct Client {
    id: String,
    secret: Vec<u8>,
    redirect_uri: Option<String>,
    display_name: String,
    revoked: bool,
}

impl Client {
    /// Register a new client with a pre-registered redirect URI.
    pub fn new(id: impl Into<String>, secret: impl Into<Vec<u8>>, display_name: impl Into<String>) -> Self {
        Client {
            id: id.into(),
            secret: secret.into(),
            redirect_uri: None,
            display_name: display_name.into(),
            revoked: false,
        }
    }

    /// Attach a pre-registered redirect URI; authorize requests for this
    /// client must supply the identical URI.
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// The client's stable identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The human-readable name shown in consent views and logs.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The pre-registered redirect URI, if any.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// Mark the client revoked; a revoked client is treated as absent by
    /// the authorize and token endpoints.
    pub fn revoke(&mut self) {
        self.revoked = true;
    }

    /// Whether the client has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    fn secret_matches(&self, candidate: &[u8]) -> bool {
        self.secret == candidate
    }
}

/// Resolves and authenticates clients by id and shared secret.
///
/// Implementations must collapse every failure condition (not found, wrong
/// secret, revoked) into the single opaque [`RegistrarError::Unspecified`]
/// so that callers cannot distinguish why a client was rejected.
pub trait Registrar {
    /// Resolve `client_id`, verifying `client_secret` when present.
    ///
    /// `client_secret` is `None` when the caller authenticated a public
    /// client by id alone (e.g. at the authorize endpoint, where no secret
    /// is transmitted); it is `Some` at the token endpoint.
    fn resolve(&self, client_id: &str, client_secret: Option<&[u8]>) -> Result<Client, RegistrarError>;
}

/// An in-memory [`Registrar`] backed by a mutex-guarded map.
///
/// Reference implementation; production deployments are expected to supply
/// their own store-backed registrar.
pub struct ClientMap {
    clients: Mutex<HashMap<String, Client>>,
}

impl ClientMap {
    /// An empty client map.
    pub fn new() -> Self {
        ClientMap {
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Register a client, replacing any previous registration under the
    /// same id.
    pub fn register_client(&self, client: Client) {
        self.clients.lock().unwrap().insert(client.id.clone(), client);
    }
}

impl Default for ClientMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Registrar for ClientMap {
    fn resolve(&self, client_id: &str, client_secret: Option<&[u8]>) -> Result<Client, RegistrarError> {
        let clients = self.clients.lock().unwrap();
        let client = clients.get(client_id).ok_or(RegistrarError::Unspecified)?;
        if client.is_revoked() {
            return Err(RegistrarError::Unspecified);
        }
        if let Some(secret) = client_secret {
            if !client.secret_matches(secret) {
                return Err(RegistrarError::Unspecified);
            }
        }
        Ok(client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ClientMap {
        let map = ClientMap::new();
        map.register_client(
            Client::new("uberclient", b"secret".to_vec(), "UberClient")
                .with_redirect_uri("http://uberclient.dot/callback"),
        );
        map
    }

    #[test]
    fn resolves_with_correct_secret() {
        let map = registry();
        let client = map.resolve("uberclient", Some(b"secret")).unwrap();
        assert_eq!(client.display_name(), "UberClient");
    }

    #[test]
    fn unknown_client_and_wrong_secret_are_indistinguishable() {
        let map = registry();
        let not_found = map.resolve("ghost", Some(b"secret")).unwrap_err();
        let wrong_secret = map.resolve("uberclient", Some(b"wrong")).unwrap_err();
        assert_eq!(not_found, wrong_secret);
    }

    #[test]
    fn revoked_client_is_rejected() {
        let map = registry();
        {
            let mut clients = map.clients.lock().unwrap();
            clients.get_mut("uberclient").unwrap().revoke();
        }
        assert!(map.resolve("uberclient", Some(b"secret")).is_err());
    }

    #[test]
    fn public_resolution_without_secret_succeeds() {
        let map = registry();
        assert!(map.resolve("uberclient", None).is_ok());
    }
}

//! Durable entities created over the lifetime of an authorization: the
//! in-flight [`AuthRequest`], the one-shot [`AccessGrant`] it produces for
//! the code flow, and the [`AccessToken`] that is ultimately redeemable
//! against a protected resource.
//!
//! Each entity has a store trait describing the contract an embedding
//! application may implement against its own database, plus a mutex-guarded
//! in-memory reference implementation suitable for tests and small
//! deployments.
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use super::generator::generate_token;
use super::scope::Scope;

/// Which authorize-endpoint flow produced (or will produce) this request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseType {
    /// The authorization code grant: the authorize endpoint hands back a
    /// code that is later redeemed at the token endpoint.
    Code,
    /// The implicit grant: the authorize endpoint hands back an access
    /// token directly, in the redirect fragment.
    Token,
}

/// The terminal state of an [`AuthRequest`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthRequestStatus {
    /// Awaiting the host application's consent decision.
    Pending,
    /// The resource owner granted access.
    Granted,
    /// The resource owner (or the authorization server) denied access.
    Denied,
}

/// A durable record of an in-flight authorization attempt.
#[derive(Clone, Debug)]
pub struct AuthRequest {
    id: String,
    client_id: String,
    scope: Scope,
    redirect_uri: String,
    response_type: ResponseType,
    state: Option<String>,
    status: AuthRequestStatus,
    grant_code: Option<String>,
    access_token: Option<String>,
    created_at: DateTime<Utc>,
}

impl AuthRequest {
    /// The correlation handle used by the host application's consent
    /// response to name this request.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn status(&self) -> AuthRequestStatus {
        self.status
    }

    pub fn grant_code(&self) -> Option<&str> {
        self.grant_code.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() > self.created_at + ttl
    }
}

/// Why a requested transition on an [`AuthRequest`] could not be applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransitionError {
    /// No request exists with that id (or it has expired).
    Unknown,
    /// The request already reached a terminal state.
    AlreadyFinalized,
}

/// Durable storage for [`AuthRequest`] records.
///
/// Implementations must make `grant`/`deny` atomic: a transition only
/// succeeds when the record is still `Pending`, and a second concurrent
/// caller observes [`TransitionError::AlreadyFinalized`] rather than
/// double-issuing a grant or token.
pub trait AuthRequestStore {
    /// Create a new pending request.
    #[allow(clippy::too_many_arguments)]
    fn create(
        &self, client_id: &str, scope: Scope, redirect_uri: String, response_type: ResponseType,
        state: Option<String>,
    ) -> AuthRequest;

    /// Look up a request without mutating it. Returns `None` once the
    /// record has expired.
    fn find(&self, id: &str) -> Option<AuthRequest>;

    /// Transition a pending request to `Granted`, recording whichever of
    /// `grant_code`/`access_token` applies to its `response_type`.
    fn grant(&self, id: &str, grant_code: Option<String>, access_token: Option<String>)
        -> Result<AuthRequest, TransitionError>;

    /// Transition a pending request to `Denied`.
    fn deny(&self, id: &str) -> Result<AuthRequest, TransitionError>;
}

/// An in-memory [`AuthRequestStore`] guarded by a single mutex.
pub struct MemoryAuthRequestStore {
    requests: Mutex<HashMap<String, AuthRequest>>,
    ttl: Duration,
}

impl MemoryAuthRequestStore {
    /// Construct a store that expires requests `ttl` after creation.
    pub fn new(ttl: Duration) -> Self {
        MemoryAuthRequestStore {
            requests: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

impl AuthRequestStore for MemoryAuthRequestStore {
    fn create(
        &self, client_id: &str, scope: Scope, redirect_uri: String, response_type: ResponseType,
        state: Option<String>,
    ) -> AuthRequest {
        let request = AuthRequest {
            id: generate_token(),
            client_id: client_id.to_string(),
            scope,
            redirect_uri,
            response_type,
            state,
            status: AuthRequestStatus::Pending,
            grant_code: None,
            access_token: None,
            created_at: Utc::now(),
        };
        self.requests
            .lock()
            .unwrap()
            .insert(request.id.clone(), request.clone());
        request
    }

    fn find(&self, id: &str) -> Option<AuthRequest> {
        let requests = self.requests.lock().unwrap();
        let request = requests.get(id)?;
        if request.is_expired(self.ttl) {
            return None;
        }
        Some(request.clone())
    }

    fn grant(
        &self, id: &str, grant_code: Option<String>, access_token: Option<String>,
    ) -> Result<AuthRequest, TransitionError> {
        let mut requests = self.requests.lock().unwrap();
        let request = requests.get_mut(id).ok_or(TransitionError::Unknown)?;
        if request.is_expired(self.ttl) {
            return Err(TransitionError::Unknown);
        }
        if request.status != AuthRequestStatus::Pending {
            return Err(TransitionError::AlreadyFinalized);
        }
        request.status = AuthRequestStatus::Granted;
        request.grant_code = grant_code;
        request.access_token = access_token;
        Ok(request.clone())
    }

    fn deny(&self, id: &str) -> Result<AuthRequest, TransitionError> {
        let mut requests = self.requests.lock().unwrap();
        let request = requests.get_mut(id).ok_or(TransitionError::Unknown)?;
        if request.is_expired(self.ttl) {
            return Err(TransitionError::Unknown);
        }
        if request.status != AuthRequestStatus::Pending {
            return Err(TransitionError::AlreadyFinalized);
        }
        request.status = AuthRequestStatus::Denied;
        Ok(request.clone())
    }
}

/// A one-shot authorization code, redeemable exactly once at the token
/// endpoint.
#[derive(Clone, Debug)]
pub struct AccessGrant {
    code: String,
    client_id: String,
    scope: Scope,
    redirect_uri: String,
    resource: String,
}

impl AccessGrant {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// The resource owner who consented, carried forward from Phase C so
    /// that redeeming the code can mint a token on their behalf.
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

/// Durable storage for [`AccessGrant`] codes.
pub trait GrantStore {
    /// Mint a fresh code bound to `client_id`/`scope`/`redirect_uri`,
    /// carrying forward the resource owner who consented.
    fn create(&self, client_id: &str, scope: Scope, redirect_uri: String, resource: String) -> AccessGrant;

    /// Redeem `code`, removing it so a second redemption observes a miss.
    /// Lookup is case-insensitive.
    fn redeem(&self, code: &str) -> Option<AccessGrant>;
}

/// An in-memory [`GrantStore`] guarded by a single mutex.
pub struct MemoryGrantStore {
    grants: Mutex<HashMap<String, AccessGrant>>,
}

impl MemoryGrantStore {
    pub fn new() -> Self {
        MemoryGrantStore {
            grants: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryGrantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GrantStore for MemoryGrantStore {
    fn create(&self, client_id: &str, scope: Scope, redirect_uri: String, resource: String) -> AccessGrant {
        let grant = AccessGrant {
            code: generate_token(),
            client_id: client_id.to_string(),
            scope,
            redirect_uri,
            resource,
        };
        self.grants.lock().unwrap().insert(grant.code.clone(), grant.clone());
        grant
    }

    fn redeem(&self, code: &str) -> Option<AccessGrant> {
        self.grants.lock().unwrap().remove(&code.to_lowercase())
    }
}

/// A bearer credential granting access to a resource on behalf of its
/// owner, scoped to a client and a set of privileges.
#[derive(Clone, Debug)]
pub struct AccessToken {
    token: String,
    resource: String,
    client_id: String,
    scope: Scope,
    expires_at: Option<DateTime<Utc>>,
    revoked: bool,
}

impl AccessToken {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if Utc::now() > at)
    }
}

/// Durable storage for [`AccessToken`]s.
///
/// `get_token_for` must be idempotent in `(resource, client_id, scope)`:
/// repeated calls for the same triple return the same live token rather
/// than minting a new one each time.
pub trait TokenStore {
    /// Mint a fresh token, unconditionally.
    fn issue(
        &self, resource: &str, client_id: &str, scope: Scope, expires_at: Option<DateTime<Utc>>,
    ) -> AccessToken;

    /// Return the existing live token for `(resource, client_id, scope)`,
    /// minting one if none exists.
    fn get_token_for(&self, resource: &str, client_id: &str, scope: &Scope) -> AccessToken;

    /// Look up a token by its value. Lookup is case-insensitive.
    fn find(&self, token: &str) -> Option<AccessToken>;
}

/// An in-memory [`TokenStore`] guarded by a single mutex.
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        MemoryTokenStore {
            tokens: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for MemoryTokenStore {
    fn issue(
        &self, resource: &str, client_id: &str, scope: Scope, expires_at: Option<DateTime<Utc>>,
    ) -> AccessToken {
        let token = AccessToken {
            token: generate_token(),
            resource: resource.to_string(),
            client_id: client_id.to_string(),
            scope,
            expires_at,
            revoked: false,
        };
        self.tokens.lock().unwrap().insert(token.token.clone(), token.clone());
        token
    }

    fn get_token_for(&self, resource: &str, client_id: &str, scope: &Scope) -> AccessToken {
        let mut tokens = self.tokens.lock().unwrap();
        if let Some(existing) = tokens.values().find(|t| {
            t.resource == resource && t.client_id == client_id && &t.scope == scope && !t.is_revoked() && !t.is_expired()
        }) {
            return existing.clone();
        }
        let token = AccessToken {
            token: generate_token(),
            resource: resource.to_string(),
            client_id: client_id.to_string(),
            scope: scope.clone(),
            expires_at: None,
            revoked: false,
        };
        tokens.insert(token.token.clone(), token.clone());
        token
    }

    fn find(&self, token: &str) -> Option<AccessToken> {
        self.tokens.lock().unwrap().get(&token.to_lowercase()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_request_grant_is_idempotent_on_second_call() {
        let store = MemoryAuthRequestStore::new(Duration::minutes(10));
        let request = store.create(
            "uberclient",
            "read".parse().unwrap(),
            "http://uberclient.dot/callback".into(),
            ResponseType::Code,
            None,
        );
        store.grant(request.id(), Some("code123".into()), None).unwrap();
        let second = store.grant(request.id(), Some("codeXXX".into()), None);
        assert_eq!(second.unwrap_err(), TransitionError::AlreadyFinalized);
    }

    #[test]
    fn auth_request_expires_after_ttl() {
        let store = MemoryAuthRequestStore::new(Duration::seconds(-1));
        let request = store.create(
            "uberclient",
            Scope::empty(),
            "http://uberclient.dot/callback".into(),
            ResponseType::Code,
            None,
        );
        assert!(store.find(request.id()).is_none());
    }

    #[test]
    fn grant_code_is_redeemable_exactly_once() {
        let store = MemoryGrantStore::new();
        let grant = store.create("uberclient", Scope::empty(), "http://uberclient.dot/callback".into(), "alice".into());
        assert!(store.redeem(grant.code()).is_some());
        assert!(store.redeem(grant.code()).is_none());
    }

    #[test]
    fn grant_code_lookup_is_case_insensitive() {
        let store = MemoryGrantStore::new();
        let grant = store.create("uberclient", Scope::empty(), "http://uberclient.dot/callback".into(), "alice".into());
        assert!(store.redeem(&grant.code().to_uppercase()).is_some());
    }

    #[test]
    fn get_token_for_is_idempotent() {
        let store = MemoryTokenStore::new();
        let scope: Scope = "read".parse().unwrap();
        let first = store.get_token_for("alice", "uberclient", &scope);
        let second = store.get_token_for("alice", "uberclient", &scope);
        assert_eq!(first.token(), second.token());
    }
}

//! The three-phase authorize-endpoint flow: pre-consent validation,
//! delegation to the host application's consent step, and finalization.
use url::Url;

use crate::config::Config;
use crate::error::{AuthorizationError, AuthorizationErrorKind};
use crate::primitives::registrar::Registrar;
use crate::primitives::scope::Scope;
use crate::primitives::store::{AuthRequest, AuthRequestStatus, AuthRequestStore, GrantStore, ResponseType, TokenStore, TransitionError};

use super::redirect_uri::{append_error, append_fragment_grant, append_query_grant, parse_redirect_uri};

/// What the host application should present for consent, once Phase A has
/// validated the request.
#[derive(Clone, Debug)]
pub struct ConsentView {
    pub client_display_name: String,
    pub scope: Scope,
}

/// The result of Phase A (pre-consent validation).
pub enum BeginOutcome {
    /// The redirect URI itself could not be trusted; report a bare 400,
    /// never a redirect.
    BadRequest(String),
    /// An error safe to report via the client's redirect URI.
    Redirect(Url),
    /// Validation passed; an `AuthRequest` was created and the host
    /// application should present `consent`.
    AwaitConsent { request: AuthRequest, consent: ConsentView },
}

/// Phase A: validate an incoming authorize request and, on success, stash
/// a pending [`AuthRequest`] for the host application to act on.
pub fn begin_authorization(
    registrar: &dyn Registrar, store: &dyn AuthRequestStore, config: &Config, client_id: Option<&str>,
    redirect_uri_param: Option<&str>, response_type_param: Option<&str>, scope_param: Option<&str>,
    state: Option<&str>,
) -> BeginOutcome {
    let redirect_uri = match parse_redirect_uri(redirect_uri_param) {
        Ok(url) => url,
        Err(err) => return BeginOutcome::BadRequest(err.description().unwrap_or("invalid redirect_uri").to_string()),
    };

    let fail = |kind: AuthorizationErrorKind, description: &'static str| {
        let err = AuthorizationError::with_description(kind, description);
        BeginOutcome::Redirect(append_error(&redirect_uri, err.code(), err.description(), state))
    };

    let client_id = match client_id {
        Some(id) if !id.is_empty() => id,
        _ => return fail(AuthorizationErrorKind::InvalidClient, "missing client_id"),
    };

    let client = match registrar.resolve(client_id, None) {
        Ok(client) => client,
        Err(_) => return fail(AuthorizationErrorKind::InvalidClient, "unknown client"),
    };

    if let Some(registered) = client.redirect_uri() {
        if registered != redirect_uri.as_str() {
            return fail(AuthorizationErrorKind::RedirectUriMismatch, "redirect_uri does not match registration");
        }
    }

    let scope: Scope = match scope_param.unwrap_or("").parse() {
        Ok(scope) => scope,
        Err(_) => return fail(AuthorizationErrorKind::InvalidScope, "scope contains invalid characters"),
    };

    if let Some(allowed) = config.scopes() {
        if !scope.is_subset_of(allowed) {
            return fail(AuthorizationErrorKind::InvalidScope, "scope exceeds what is allowed");
        }
    }

    let response_type = match response_type_param {
        Some("code") if config.authorization_types().contains(&ResponseType::Code) => ResponseType::Code,
        Some("token") if config.authorization_types().contains(&ResponseType::Token) => ResponseType::Token,
        _ => return fail(AuthorizationErrorKind::UnsupportedResponseType, "unsupported response_type"),
    };

    let request = store.create(
        client.id(),
        scope.clone(),
        redirect_uri.to_string(),
        response_type,
        state.map(str::to_string),
    );

    BeginOutcome::AwaitConsent {
        request,
        consent: ConsentView {
            client_display_name: client.display_name().to_string(),
            scope,
        },
    }
}

/// The host application's consent decision, delivered via Phase B.
pub enum ConsentOutcome {
    /// Access was granted; `resource` names the authenticated end-user,
    /// required when the flow will mint an access token directly.
    Grant { resource: Option<String> },
    /// Access was denied.
    Deny,
}

/// The result of Phase C (finalization).
pub enum FinalizeOutcome {
    /// A 302 to the client's redirect URI (grant, deny, or a recoverable
    /// protocol-level failure).
    Redirect(Url),
    /// No redirect target could be recovered; report a bare 400.
    BadRequest(String),
}

/// Phase C: apply the host application's consent decision to the pending
/// request and produce the redirect the client should receive.
///
/// Idempotent: a second finalization of an already-terminal request
/// replays the original outcome instead of minting a second grant.
pub fn finalize_authorization(
    store: &dyn AuthRequestStore, grants: &dyn GrantStore, tokens: &dyn TokenStore, id: &str,
    outcome: ConsentOutcome,
) -> FinalizeOutcome {
    match outcome {
        ConsentOutcome::Deny => match store.deny(id) {
            Ok(request) => redirect_for(&request),
            Err(TransitionError::Unknown) => FinalizeOutcome::BadRequest("unknown or expired authorization request".into()),
            Err(TransitionError::AlreadyFinalized) => replay(store, id),
        },
        ConsentOutcome::Grant { resource } => {
            let pending = match store.find(id) {
                Some(request) if request.status() == AuthRequestStatus::Pending => request,
                Some(_) => return replay(store, id),
                None => return FinalizeOutcome::BadRequest("unknown or expired authorization request".into()),
            };

            let resource = resource.unwrap_or_default();
            let (grant_code, access_token) = match pending.response_type() {
                ResponseType::Code => {
                    let grant = grants.create(
                        pending.client_id(),
                        pending.scope().clone(),
                        pending.redirect_uri().to_string(),
                        resource,
                    );
                    (Some(grant.code().to_string()), None)
                }
                ResponseType::Token => {
                    let token = tokens.issue(&resource, pending.client_id(), pending.scope().clone(), None);
                    (None, Some(token.token().to_string()))
                }
            };

            match store.grant(id, grant_code, access_token) {
                Ok(request) => redirect_for(&request),
                Err(TransitionError::Unknown) => FinalizeOutcome::BadRequest("unknown or expired authorization request".into()),
                Err(TransitionError::AlreadyFinalized) => replay(store, id),
            }
        }
    }
}

fn replay(store: &dyn AuthRequestStore, id: &str) -> FinalizeOutcome {
    match store.find(id) {
        Some(request) => redirect_for(&request),
        None => FinalizeOutcome::BadRequest("unknown or expired authorization request".into()),
    }
}

fn redirect_for(request: &AuthRequest) -> FinalizeOutcome {
    let base = match Url::parse(request.redirect_uri()) {
        Ok(url) => url,
        Err(_) => return FinalizeOutcome::BadRequest("authorization request has no usable redirect_uri".into()),
    };

    let url = match request.status() {
        AuthRequestStatus::Denied => append_error(&base, "access_denied", None, request.state()),
        AuthRequestStatus::Granted => match request.response_type() {
            ResponseType::Code => append_query_grant(
                &base,
                request.grant_code().unwrap_or_default(),
                &request.scope().to_string(),
                request.state(),
            ),
            ResponseType::Token => append_fragment_grant(
                &base,
                request.access_token().unwrap_or_default(),
                &request.scope().to_string(),
                request.state(),
            ),
        },
        AuthRequestStatus::Pending => unreachable!("redirect_for is only called on terminal requests"),
    };

    FinalizeOutcome::Redirect(url)
}

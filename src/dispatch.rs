//! Request classification and the glue between the protocol flows and the
//! host application.
//!
//! The host application is any collaborator implementing [`HostApp`]; the
//! core never calls into a specific web framework. Communication in both
//! directions happens through a small set of well-known headers attached
//! to the `http` request/response the core builds for the host, mirroring
//! how the host-application contract is described in the specification.
use std::collections::HashMap;

use http::{HeaderName, Method, Request, Response, StatusCode};
use log::{debug, trace, warn};

use crate::config::Config;
use crate::primitives::registrar::Registrar;
use crate::primitives::store::{AuthRequestStore, GrantStore, TokenStore};
use crate::protocol::authorizer::{self, BeginOutcome, ConsentOutcome, FinalizeOutcome};
use crate::protocol::decoder;
use crate::protocol::resource_gate;
use crate::protocol::token_issuer;

/// The in-flight authorization id, attached to the request the core hands
/// the host application during consent, and expected back (naming the
/// same or another in-flight request) on the host's response to trigger
/// finalization.
pub fn header_authorization() -> HeaderName {
    HeaderName::from_static("oauth.authorization")
}

/// Set by the host application to signal "no credentials were presented
/// and none are implied"; triggers a bare unauthenticated challenge.
pub fn header_no_access() -> HeaderName {
    HeaderName::from_static("oauth.no_access")
}

/// Set by the host application alongside a 403 to signal which scopes
/// were missing; triggers an `insufficient_scope` challenge.
pub fn header_no_scope() -> HeaderName {
    HeaderName::from_static("oauth.no_scope")
}

/// Attached by the core to an authenticated resource request, naming the
/// validated access token.
pub fn header_access_token() -> HeaderName {
    HeaderName::from_static("oauth.access_token")
}

/// Attached by the core to an authenticated resource request, naming the
/// resource (end-user) the token acts on behalf of.
pub fn header_resource() -> HeaderName {
    HeaderName::from_static("oauth.resource")
}

/// The host application collaborator: everything the core does not own
/// (the consent UI, user authentication, and arbitrary protected
/// resources) is reached through this single trait.
pub trait HostApp {
    /// Handle a request the core has finished annotating and return the
    /// response to relay (or further process) on its behalf.
    fn handle(&self, request: Request<Vec<u8>>) -> Response<Vec<u8>>;
}

/// Classifies inbound requests and drives the Authorizer, TokenIssuer, and
/// ResourceGate flows against a host application and a set of stores.
pub struct Dispatcher<H> {
    registrar: Box<dyn Registrar>,
    auth_requests: Box<dyn AuthRequestStore>,
    grants: Box<dyn GrantStore>,
    tokens: Box<dyn TokenStore>,
    config: Config,
    host: H,
}

impl<H: HostApp> Dispatcher<H> {
    /// Assemble a dispatcher from its stores, configuration, and host
    /// application.
    pub fn new(
        registrar: Box<dyn Registrar>, auth_requests: Box<dyn AuthRequestStore>, grants: Box<dyn GrantStore>,
        tokens: Box<dyn TokenStore>, config: Config, host: H,
    ) -> Self {
        Dispatcher {
            registrar,
            auth_requests,
            grants,
            tokens,
            config,
            host,
        }
    }

    /// Classify and handle one inbound request.
    pub fn dispatch(&self, request: Request<Vec<u8>>) -> Response<Vec<u8>> {
        let path = request.uri().path().to_string();
        if path == self.config.authorize_path() {
            debug!("dispatch: authorization-request");
            self.handle_authorize(request)
        } else if path == self.config.access_token_path() {
            debug!("dispatch: token-request");
            self.handle_token(request)
        } else {
            debug!("dispatch: resource-request {}", path);
            self.handle_resource(request)
        }
    }

    fn handle_authorize(&self, request: Request<Vec<u8>>) -> Response<Vec<u8>> {
        let query = parse_query(&request);

        let outcome = authorizer::begin_authorization(
            &*self.registrar,
            &*self.auth_requests,
            &self.config,
            query.get("client_id").map(String::as_str),
            query.get("redirect_uri").map(String::as_str),
            query.get("response_type").map(String::as_str),
            query.get("scope").map(String::as_str),
            query.get("state").map(String::as_str),
        );

        match outcome {
            BeginOutcome::BadRequest(message) => {
                warn!("authorization rejected without redirect: {}", message);
                text_response(StatusCode::BAD_REQUEST, &message)
            }
            BeginOutcome::Redirect(url) => {
                warn!("authorization redirected with error");
                redirect_response(url.as_str())
            }
            BeginOutcome::AwaitConsent { request: pending, consent } => {
                trace!("authorization pending consent: client={}", pending.client_id());
                let consent_request = Request::builder()
                    .method(Method::POST)
                    .uri("/")
                    .header(header_authorization(), pending.id())
                    .body(
                        serde_json::json!({
                            "client": consent.client_display_name,
                            "scope": consent.scope.to_string(),
                        })
                        .to_string()
                        .into_bytes(),
                    )
                    .expect("well-formed consent request");

                let response = self.host.handle(consent_request);
                self.finalize_if_sentinel(&response).unwrap_or(response)
            }
        }
    }

    /// Phase C's trigger: if `response` carries the `oauth.authorization`
    /// sentinel naming an in-flight AuthRequest, finalize it (status `401`
    /// denies, anything else grants) and return the resulting redirect or
    /// bad-request. Returns `None` when the response carries no sentinel,
    /// meaning the host app has not yet reached a consent decision (e.g. it
    /// is merely rendering the consent view) and the response should be
    /// relayed to the client as-is.
    fn finalize_if_sentinel(&self, response: &Response<Vec<u8>>) -> Option<Response<Vec<u8>>> {
        let id = response.headers().get(header_authorization())?.to_str().ok()?.to_string();

        let outcome = if response.status() == StatusCode::UNAUTHORIZED {
            ConsentOutcome::Deny
        } else {
            let resource = std::str::from_utf8(response.body())
                .ok()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            ConsentOutcome::Grant { resource }
        };

        Some(
            match authorizer::finalize_authorization(&*self.auth_requests, &*self.grants, &*self.tokens, &id, outcome) {
                FinalizeOutcome::Redirect(url) => redirect_response(url.as_str()),
                FinalizeOutcome::BadRequest(message) => text_response(StatusCode::BAD_REQUEST, &message),
            },
        )
    }

    fn handle_token(&self, request: Request<Vec<u8>>) -> Response<Vec<u8>> {
        if request.method() != &Method::POST {
            return json_response(StatusCode::METHOD_NOT_ALLOWED, serde_json::json!("POST only"));
        }

        let query = parse_query(&request);
        let credentials = decoder::credentials(request.headers());
        let body_params = decoder::parse_params(request.body());
        let host_header = request.uri().host().unwrap_or("").to_string();

        let response = token_issuer::issue_token(
            &*self.registrar,
            &*self.grants,
            &*self.tokens,
            &self.config,
            credentials,
            &body_params,
            &query,
            &host_header,
        );

        let mut builder = Response::builder()
            .status(StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_REQUEST))
            .header("content-type", "application/json")
            .header("cache-control", "no-store");

        if let Some(realm) = &response.challenge_realm {
            builder = builder.header(
                "www-authenticate",
                resource_gate::challenge_header(realm, None, None),
            );
        }

        builder
            .body(response.body.to_string().into_bytes())
            .expect("well-formed token response")
    }

    fn handle_resource(&self, request: Request<Vec<u8>>) -> Response<Vec<u8>> {
        let query = parse_query(&request);
        let credentials = decoder::credentials(request.headers());
        let body_params = decoder::parse_params(request.body());
        let realm = self.config.realm(request.uri().host().unwrap_or(""));

        let token_value = resource_gate::extract_bearer_token(&credentials, &body_params, &query);

        let token_value = match token_value {
            None => {
                let response = self.host.handle(request);
                if let Some(finalized) = self.finalize_if_sentinel(&response) {
                    return finalized;
                }
                if response.headers().contains_key(header_no_access()) {
                    return unauthorized_challenge(&realm, None);
                }
                return response;
            }
            Some(token) => token,
        };

        let token = match resource_gate::validate_token(&*self.tokens, &token_value) {
            Ok(token) => token,
            Err(error) => {
                warn!("resource request rejected: {}", error.code());
                return unauthorized_challenge(&realm, Some(&error));
            }
        };

        let mut annotated = request;
        annotated
            .headers_mut()
            .insert(header_access_token(), token.token().parse().expect("token is a valid header value"));
        annotated.headers_mut().insert(
            header_resource(),
            token.resource().parse().expect("resource identifiers are valid header values"),
        );

        let response = self.host.handle(annotated);
        if response.status() == StatusCode::FORBIDDEN {
            if let Some(scopes) = response.headers().get(header_no_scope()).and_then(|v| v.to_str().ok()) {
                let scope = resource_gate::normalize_no_scope(scopes);
                let error = crate::error::ResourceError::new(crate::error::ResourceErrorKind::InsufficientScope);
                let mut response = Response::builder()
                    .status(StatusCode::FORBIDDEN)
                    .header("www-authenticate", resource_gate::challenge_header(&realm, Some(&error), Some(&scope)))
                    .body(Vec::new())
                    .expect("well-formed challenge response");
                response.headers_mut().remove(header_no_scope());
                return response;
            }
        }
        response
    }
}

fn unauthorized_challenge(realm: &str, error: Option<&crate::error::ResourceError>) -> Response<Vec<u8>> {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header("www-authenticate", resource_gate::challenge_header(realm, error, None))
        .body(Vec::new())
        .expect("well-formed challenge response")
}

fn parse_query(request: &Request<Vec<u8>>) -> HashMap<String, String> {
    request
        .uri()
        .query()
        .map(|q| decoder::parse_params(q.as_bytes()))
        .unwrap_or_default()
}

fn text_response(status: StatusCode, message: &str) -> Response<Vec<u8>> {
    Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .body(message.as_bytes().to_vec())
        .expect("well-formed text response")
}

fn redirect_response(location: &str) -> Response<Vec<u8>> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header("location", location)
        .body(Vec::new())
        .expect("well-formed redirect response")
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Vec<u8>> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(body.to_string().into_bytes())
        .expect("well-formed json response")
}

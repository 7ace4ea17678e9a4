//! Error taxonomy shared across the protocol flows.
//!
//! Mirrors the wire codes from [rfc6749], split by the flow that produces
//! them so that each flow's response-building code only has to match on the
//! variants it can actually receive.
//!
//! [rfc6749]: https://tools.ietf.org/html/rfc6749#section-6

use std::borrow::Cow;

/// Failure to resolve or authenticate a client.
///
/// The variant never leaks *which* condition failed (not found, wrong
/// secret, revoked); callers must collapse this to a single wire code.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RegistrarError {
    /// No client matched, the secret did not match, or the client is revoked.
    #[error("invalid client")]
    Unspecified,
}

/// A redirect-safe or redirect-unsafe error produced while processing an
/// authorization request.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct AuthorizationError {
    kind: AuthorizationErrorKind,
    description: Option<Cow<'static, str>>,
}

/// The wire error code for an [`AuthorizationError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AuthorizationErrorKind {
    /// The redirect URI itself was missing or malformed; this is the one
    /// authorization-time failure that is reported as a bare 400 instead of
    /// a redirect, because the redirect target cannot be trusted.
    #[error("invalid_request")]
    InvalidRequest,
    #[error("invalid_client")]
    InvalidClient,
    #[error("redirect_uri_mismatch")]
    RedirectUriMismatch,
    #[error("access_denied")]
    AccessDenied,
    #[error("unsupported_response_type")]
    UnsupportedResponseType,
    #[error("invalid_scope")]
    InvalidScope,
}

impl AuthorizationError {
    pub(crate) fn new(kind: AuthorizationErrorKind) -> Self {
        AuthorizationError {
            kind,
            description: None,
        }
    }

    pub(crate) fn with_description(kind: AuthorizationErrorKind, description: &'static str) -> Self {
        AuthorizationError {
            kind,
            description: Some(Cow::Borrowed(description)),
        }
    }

    /// The stable wire code, e.g. `"invalid_scope"`.
    pub fn code(&self) -> &'static str {
        match self.kind {
            AuthorizationErrorKind::InvalidRequest => "invalid_request",
            AuthorizationErrorKind::InvalidClient => "invalid_client",
            AuthorizationErrorKind::RedirectUriMismatch => "redirect_uri_mismatch",
            AuthorizationErrorKind::AccessDenied => "access_denied",
            AuthorizationErrorKind::UnsupportedResponseType => "unsupported_response_type",
            AuthorizationErrorKind::InvalidScope => "invalid_scope",
        }
    }

    /// Whether this failure is safe to report via a 302 redirect.
    ///
    /// The only redirect-unsafe failure is a bad redirect URI itself, since
    /// there is then no trustworthy target to redirect to.
    pub fn is_redirect_safe(&self) -> bool {
        !matches!(self.kind, AuthorizationErrorKind::InvalidRequest)
    }

    /// The human-readable description, if any was attached.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub(crate) fn kind(&self) -> AuthorizationErrorKind {
        self.kind
    }
}

/// A failure produced while issuing a token.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct AccessTokenError {
    kind: AccessTokenErrorKind,
    description: Option<Cow<'static, str>>,
}

/// The wire error code for an [`AccessTokenError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AccessTokenErrorKind {
    #[error("invalid_request")]
    InvalidRequest,
    #[error("invalid_client")]
    InvalidClient,
    #[error("invalid_grant")]
    InvalidGrant,
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,
    #[error("invalid_scope")]
    InvalidScope,
}

impl AccessTokenError {
    pub(crate) fn new(kind: AccessTokenErrorKind) -> Self {
        AccessTokenError {
            kind,
            description: None,
        }
    }

    pub(crate) fn with_description(kind: AccessTokenErrorKind, description: &'static str) -> Self {
        AccessTokenError {
            kind,
            description: Some(Cow::Borrowed(description)),
        }
    }

    /// The stable wire code, e.g. `"invalid_grant"`.
    pub fn code(&self) -> &'static str {
        match self.kind {
            AccessTokenErrorKind::InvalidRequest => "invalid_request",
            AccessTokenErrorKind::InvalidClient => "invalid_client",
            AccessTokenErrorKind::InvalidGrant => "invalid_grant",
            AccessTokenErrorKind::UnsupportedGrantType => "unsupported_grant_type",
            AccessTokenErrorKind::InvalidScope => "invalid_scope",
        }
    }

    /// The error kind.
    pub fn kind(&self) -> AccessTokenErrorKind {
        self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Serialize to the JSON body shape the token endpoint returns on error.
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({ "error": self.code() });
        if let Some(description) = &self.description {
            body["error_description"] = serde_json::Value::String(description.to_string());
        }
        body
    }
}

/// A failure produced while guarding a protected resource.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct ResourceError {
    kind: ResourceErrorKind,
    description: Option<Cow<'static, str>>,
}

/// The wire error code for a [`ResourceError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ResourceErrorKind {
    #[error("invalid_token")]
    InvalidToken,
    #[error("expired_token")]
    ExpiredToken,
    #[error("insufficient_scope")]
    InsufficientScope,
}

impl ResourceError {
    pub(crate) fn new(kind: ResourceErrorKind) -> Self {
        ResourceError {
            kind,
            description: None,
        }
    }

    pub(crate) fn with_description(kind: ResourceErrorKind, description: &'static str) -> Self {
        ResourceError {
            kind,
            description: Some(Cow::Borrowed(description)),
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind {
            ResourceErrorKind::InvalidToken => "invalid_token",
            ResourceErrorKind::ExpiredToken => "expired_token",
            ResourceErrorKind::InsufficientScope => "insufficient_scope",
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

//! The protocol flows: decoding credentials, validating redirect URIs, and
//! the three endpoint-facing algorithms (authorize, token, resource).
pub mod authorizer;
pub mod decoder;
pub mod redirect_uri;
pub mod resource_gate;
pub mod token_issuer;

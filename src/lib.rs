//! # oxide-gate
//!
//! An OAuth2 authorization server delivered as HTTP middleware, aligned with
//! [draft-ietf-oauth-v2-10]. The core is agnostic of the host web
//! framework: it classifies inbound requests, validates them against the
//! protocol's rules, and hands off consent and resource protection to a
//! single host application collaborator reached through the [`HostApp`]
//! trait in [`dispatch`].
//!
//! ## About
//!
//! Clients are registered through the [`primitives::registrar`] module.
//! Authorization requests, authorization codes, and access tokens are
//! durable entities described in [`primitives::store`], each with an
//! in-memory reference implementation suitable for tests and small
//! deployments; production use is expected to supply its own store
//! backends against the same traits.
//!
//! The protocol flows themselves live in [`protocol`]: [`protocol::decoder`]
//! and [`protocol::redirect_uri`] are the small, pure building blocks;
//! [`protocol::authorizer`], [`protocol::token_issuer`] and
//! [`protocol::resource_gate`] implement the authorize endpoint, the token
//! endpoint, and the bearer-token resource gate respectively.
//!
//! [draft-ietf-oauth-v2-10]: https://tools.ietf.org/html/draft-ietf-oauth-v2-10
//! [`HostApp`]: dispatch::HostApp
#![warn(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod primitives;
pub mod protocol;

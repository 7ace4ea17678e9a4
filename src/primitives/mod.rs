//! Building blocks used by the protocol flows: client registration, scope
//! handling, random identifier generation, and the durable entities
//! (authorization requests, grants, tokens) together with their store
//! traits and in-memory reference implementations.
pub mod generator;
pub mod registrar;
pub mod scope;
pub mod store;

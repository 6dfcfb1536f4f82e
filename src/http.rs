//! HTTP helpers for certificate retrieval and cache semantics.

pub mod client;
pub mod semantics;

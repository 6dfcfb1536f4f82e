//! Public-key caching for ID token verification.

pub mod manager;
pub mod state;

//! Custom token minting and ID token verification.

pub mod claims;
pub mod decode;
pub mod generator;

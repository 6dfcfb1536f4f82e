//! Mint Firebase Auth custom tokens and verify Firebase ID tokens against Google's rotating
//! signing certificates.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod credential;
pub mod entry;
pub mod http;
pub mod metrics;
pub mod token;

mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, TimeDelta, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}

#[cfg(feature = "prometheus")] pub use crate::metrics::install_default_exporter;
pub use crate::{
	auth::{
		AccessToken, Auth, AuthOptions, ListenerId,
		provider::{AccessTokenProvider, ServiceAccountTokenProvider, UnauthenticatedProvider},
	},
	cache::{manager::KeyCache, state::PublicKeySet},
	config::VerifierConfig,
	credential::{Credential, CredentialSource},
	error::{Error, Result, WrongTokenKind},
	token::{claims::DecodedIdToken, generator::TokenGenerator},
};

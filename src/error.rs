//! Crate-wide error types and `Result` alias.

// std
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Appended to every ID token verification failure.
pub(crate) const VERIFY_DOCS_HINT: &str = "See https://firebase.google.com/docs/auth/server/verify-id-tokens for details on how to retrieve an ID token.";
/// Appended to audience and issuer mismatches.
pub(crate) const PROJECT_MATCH_HINT: &str = "Make sure the ID token comes from the same Firebase project as the service account used to authenticate this SDK.";

/// Token flavours that are sometimes handed to the ID token verifier by mistake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrongTokenKind {
	/// A custom token minted by a service account.
	CustomToken,
	/// A pre-v3 custom token signed with a database secret.
	LegacyCustomToken,
}
impl Display for WrongTokenKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::CustomToken => f.write_str("custom token"),
			Self::LegacyCustomToken => f.write_str("legacy custom token"),
		}
	}
}

/// Unified error type for the crate.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Jsonwebtoken(#[from] jsonwebtoken::errors::Error),

	#[error("Failed to parse service account key file: {0}")]
	CredentialParse(String),
	#[error("Invalid service account: {0}")]
	CredentialInvalid(String),

	#[error("Invalid uid: {0}")]
	InvalidUid(String),
	#[error("Invalid developer claims: {0}")]
	InvalidClaims(String),
	#[error("Developer claim \"{claim}\" is reserved and cannot be specified.")]
	ReservedClaim { claim: String },

	#[error("verify_id_token() requires a service account with \"project_id\" set.")]
	VerifierNotConfigured,
	#[error("verify_id_token() must be given a non-empty Firebase ID token. {hint}", hint = VERIFY_DOCS_HINT)]
	MalformedToken,
	#[error("Decoding Firebase ID token failed ({0}). Make sure you passed the entire string JWT which represents an ID token. {hint}", hint = VERIFY_DOCS_HINT)]
	Decode(String),
	#[error("verify_id_token() expects an ID token, but was given a {0}. {hint}", hint = VERIFY_DOCS_HINT)]
	WrongTokenType(WrongTokenKind),
	#[error("Firebase ID token has no \"kid\" claim. {hint}", hint = VERIFY_DOCS_HINT)]
	MissingKeyId,
	#[error("Firebase ID token has incorrect algorithm. Expected \"{expected}\" but got \"{actual}\". {hint}", hint = VERIFY_DOCS_HINT)]
	AlgorithmMismatch { expected: &'static str, actual: String },
	#[error("Firebase ID token has incorrect \"aud\" (audience) claim. Expected \"{expected}\" but got \"{actual}\". {project} {hint}", project = PROJECT_MATCH_HINT, hint = VERIFY_DOCS_HINT)]
	AudienceMismatch { expected: String, actual: String },
	#[error("Firebase ID token has incorrect \"iss\" (issuer) claim. Expected \"{expected}\" but got \"{actual}\". {project} {hint}", project = PROJECT_MATCH_HINT, hint = VERIFY_DOCS_HINT)]
	IssuerMismatch { expected: String, actual: String },
	#[error("Firebase ID token has {0}. {hint}", hint = VERIFY_DOCS_HINT)]
	SubjectInvalid(&'static str),
	#[error("Firebase ID token has \"kid\" claim \"{kid}\" which does not correspond to a known public key. Most likely the ID token is expired, so get a fresh token from your client app and try again. {hint}", hint = VERIFY_DOCS_HINT)]
	UnknownKeyId { kid: String },
	#[error("Firebase ID token has expired. Get a fresh token from your client app and try again. {hint}", hint = VERIFY_DOCS_HINT)]
	TokenExpired,
	#[error("Firebase ID token has invalid signature. {hint}", hint = VERIFY_DOCS_HINT)]
	InvalidSignature,
	#[error("Error fetching public keys for Google certs: {0}")]
	KeyFetch(String),

	#[error("Must initialize the auth service with a service account to call {operation}().")]
	NotConfigured { operation: &'static str },
	#[error("Credential created an invalid access token: {0}")]
	InvalidAccessToken(String),
	#[error("Failed to obtain an access token: {0}")]
	AccessTokenFetch(String),

	#[error("Metrics error: {0}")]
	Metrics(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
impl Error {
	/// Stable, low-cardinality name of the error variant, suitable for metric labels.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Jsonwebtoken(_) => "jsonwebtoken",
			Self::CredentialParse(_) => "credential_parse",
			Self::CredentialInvalid(_) => "credential_invalid",
			Self::InvalidUid(_) => "invalid_uid",
			Self::InvalidClaims(_) => "invalid_claims",
			Self::ReservedClaim { .. } => "reserved_claim",
			Self::VerifierNotConfigured => "verifier_not_configured",
			Self::MalformedToken => "malformed_token",
			Self::Decode(_) => "decode",
			Self::WrongTokenType(_) => "wrong_token_type",
			Self::MissingKeyId => "missing_key_id",
			Self::AlgorithmMismatch { .. } => "algorithm_mismatch",
			Self::AudienceMismatch { .. } => "audience_mismatch",
			Self::IssuerMismatch { .. } => "issuer_mismatch",
			Self::SubjectInvalid(_) => "subject_invalid",
			Self::UnknownKeyId { .. } => "unknown_key_id",
			Self::TokenExpired => "token_expired",
			Self::InvalidSignature => "invalid_signature",
			Self::KeyFetch(_) => "key_fetch",
			Self::NotConfigured { .. } => "not_configured",
			Self::InvalidAccessToken(_) => "invalid_access_token",
			Self::AccessTokenFetch(_) => "access_token_fetch",
			Self::Metrics(_) => "metrics",
			Self::Validation { .. } => "validation",
		}
	}
}

//! Custom token payloads and decoded ID token claims.

// crates.io
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Audience of every custom token.
pub const CUSTOM_TOKEN_AUDIENCE: &str =
	"https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";
/// Signing algorithm for custom tokens and the only one accepted on ID tokens.
pub const ALGORITHM: Algorithm = Algorithm::RS256;
/// Lifetime of a custom token.
pub const CUSTOM_TOKEN_TTL: Duration = Duration::from_secs(3600);
/// Maximum length, in characters, of a uid or ID token subject.
pub const MAX_UID_LENGTH: usize = 128;
/// Claim names developers may not set on custom tokens.
pub const RESERVED_CLAIMS: [&str; 14] = [
	"acr",
	"amr",
	"at_hash",
	"aud",
	"auth_time",
	"azp",
	"cnf",
	"c_hash",
	"exp",
	"iat",
	"iss",
	"jti",
	"nbf",
	"nonce",
];

/// Payload of a custom token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomTokenClaims {
	/// User the token signs in.
	pub uid: String,
	/// Developer claims, absent when none were supplied.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub claims: Option<Map<String, Value>>,
	/// Always [`CUSTOM_TOKEN_AUDIENCE`].
	pub aud: String,
	/// Service account email.
	pub iss: String,
	/// Service account email.
	pub sub: String,
	/// Issued-at, seconds since the epoch.
	pub iat: i64,
	/// Expiry, seconds since the epoch.
	pub exp: i64,
}
impl CustomTokenClaims {
	/// Assemble the payload for `uid` issued by `client_email` at `issued_at`.
	pub fn new(
		uid: impl Into<String>,
		claims: Option<Map<String, Value>>,
		client_email: &str,
		issued_at: DateTime<Utc>,
	) -> Self {
		Self {
			uid: uid.into(),
			claims,
			aud: CUSTOM_TOKEN_AUDIENCE.into(),
			iss: client_email.into(),
			sub: client_email.into(),
			iat: issued_at.timestamp(),
			exp: issued_at.timestamp() + CUSTOM_TOKEN_TTL.as_secs() as i64,
		}
	}
}

/// Claims of a verified ID token, with `uid` copied from `sub`.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedIdToken {
	/// Firebase user id.
	pub uid: String,
	/// Full payload, including the inserted `uid`.
	pub claims: Map<String, Value>,
}
impl DecodedIdToken {
	/// Wrap a verified payload, copying `sub` into `uid`.
	pub fn from_payload(mut claims: Map<String, Value>) -> Self {
		let uid = claims.get("sub").and_then(Value::as_str).unwrap_or_default().to_owned();

		claims.insert("uid".into(), Value::String(uid.clone()));

		Self { uid, claims }
	}

	/// Raw claim lookup.
	pub fn get(&self, claim: &str) -> Option<&Value> {
		self.claims.get(claim)
	}

	/// `aud` claim, the Firebase project id.
	pub fn audience(&self) -> Option<&str> {
		self.get("aud").and_then(Value::as_str)
	}

	/// `iss` claim.
	pub fn issuer(&self) -> Option<&str> {
		self.get("iss").and_then(Value::as_str)
	}

	/// `exp` claim as a UTC timestamp.
	pub fn expires_at(&self) -> Option<DateTime<Utc>> {
		self.timestamp("exp")
	}

	/// `iat` claim as a UTC timestamp.
	pub fn issued_at(&self) -> Option<DateTime<Utc>> {
		self.timestamp("iat")
	}

	/// `auth_time` claim as a UTC timestamp.
	pub fn auth_time(&self) -> Option<DateTime<Utc>> {
		self.timestamp("auth_time")
	}

	fn timestamp(&self, claim: &str) -> Option<DateTime<Utc>> {
		self.get(claim).and_then(Value::as_i64).and_then(|secs| DateTime::from_timestamp(secs, 0))
	}
}

/// Check that `uid` is a non-empty string of at most [`MAX_UID_LENGTH`] characters.
pub fn validate_uid(uid: &str) -> Result<()> {
	if uid.is_empty() {
		return Err(Error::InvalidUid("uid must be a non-empty string.".into()));
	}
	if uid.chars().count() > MAX_UID_LENGTH {
		return Err(Error::InvalidUid(format!(
			"uid must not be longer than {MAX_UID_LENGTH} characters."
		)));
	}

	Ok(())
}

/// Serialise developer claims, requiring a JSON object free of reserved names.
pub fn developer_claims<T>(claims: &T) -> Result<Map<String, Value>>
where
	T: Serialize + ?Sized,
{
	let value = serde_json::to_value(claims)
		.map_err(|err| Error::InvalidClaims(format!("claims must be serialisable: {err}.")))?;
	let Value::Object(claims) = value else {
		return Err(Error::InvalidClaims("claims must be an object of key-value pairs.".into()));
	};

	if let Some(claim) = claims.keys().find(|key| RESERVED_CLAIMS.contains(&key.as_str())) {
		return Err(Error::ReservedClaim { claim: claim.clone() });
	}

	Ok(claims)
}

//! Custom token minting and ID token verification.

// std
use std::fmt::{Debug, Formatter, Result as FmtResult};
// crates.io
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::Serialize;
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	cache::manager::KeyCache,
	config::VerifierConfig,
	credential::Credential,
	error::WrongTokenKind,
	metrics,
	token::{
		claims::{
			self, ALGORITHM, CUSTOM_TOKEN_AUDIENCE, CustomTokenClaims, DecodedIdToken,
			MAX_UID_LENGTH,
		},
		decode::{self, UnverifiedToken},
	},
};

const EXPECTED_ALGORITHM: &str = "RS256";
const LEGACY_ALGORITHM: &str = "HS256";

/// Signs custom tokens with a service account and verifies Firebase ID tokens.
///
/// Cloning is cheap; clones share the signing key and the public key cache.
#[derive(Clone)]
pub struct TokenGenerator {
	credential: Arc<Credential>,
	encoding_key: Arc<EncodingKey>,
	keys: KeyCache,
}
impl TokenGenerator {
	/// Build a generator that verifies against Google's production certificates.
	pub fn new(credential: Credential) -> Result<Self> {
		Self::with_config(credential, VerifierConfig::default())
	}

	/// Build a generator with a custom verifier configuration.
	pub fn with_config(credential: Credential, config: VerifierConfig) -> Result<Self> {
		Self::with_key_cache(credential, KeyCache::new(config)?)
	}

	/// Build a generator around an existing key cache, e.g. one shared across generators.
	pub fn with_key_cache(credential: Credential, keys: KeyCache) -> Result<Self> {
		let encoding_key = credential.encoding_key()?;

		Ok(Self { credential: Arc::new(credential), encoding_key: Arc::new(encoding_key), keys })
	}

	/// Credential the generator signs with.
	pub fn credential(&self) -> &Credential {
		&self.credential
	}

	/// Public key cache used for verification.
	pub fn key_cache(&self) -> &KeyCache {
		&self.keys
	}

	/// Mint a custom token for `uid` without developer claims.
	pub fn create_custom_token(&self, uid: &str) -> Result<String> {
		claims::validate_uid(uid)?;

		self.sign(uid, None)
	}

	/// Mint a custom token for `uid` carrying `developer_claims`.
	///
	/// The claims must serialise to a JSON object whose keys avoid
	/// [`RESERVED_CLAIMS`](claims::RESERVED_CLAIMS).
	pub fn create_custom_token_with_claims<T>(
		&self,
		uid: &str,
		developer_claims: &T,
	) -> Result<String>
	where
		T: Serialize + ?Sized,
	{
		claims::validate_uid(uid)?;

		let developer_claims = claims::developer_claims(developer_claims)?;

		self.sign(uid, Some(developer_claims))
	}

	/// Verify a Firebase ID token and return its claims.
	///
	/// All structural checks run before the key cache is consulted, so malformed input never
	/// causes a certificate fetch.
	#[tracing::instrument(skip_all)]
	pub async fn verify_id_token(&self, token: &str) -> Result<DecodedIdToken> {
		let outcome = self.verify(token).await;

		match &outcome {
			Ok(decoded) => {
				metrics::record_verification("success");
				tracing::debug!(uid = %decoded.uid, "ID token verified");
			},
			Err(err) => {
				metrics::record_verification(err.kind());
				tracing::debug!(error = %err, "ID token rejected");
			},
		}

		outcome
	}

	fn sign(&self, uid: &str, developer_claims: Option<Map<String, Value>>) -> Result<String> {
		let payload = CustomTokenClaims::new(
			uid,
			developer_claims,
			self.credential.client_email(),
			Utc::now(),
		);
		let mut header = Header::new(ALGORITHM);

		header.kid = self.credential.private_key_id().map(str::to_owned);

		let token = jsonwebtoken::encode(&header, &payload, &self.encoding_key)?;

		metrics::record_custom_token_issued();
		tracing::debug!(uid, exp = payload.exp, "custom token minted");

		Ok(token)
	}

	async fn verify(&self, token: &str) -> Result<DecodedIdToken> {
		let checked = self.check_locally(token)?;
		let keys = self.keys.fetch().await?;
		let Some(pem) = keys.get(&checked.kid) else {
			return Err(Error::UnknownKeyId { kid: checked.kid });
		};
		let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|err| {
			Error::KeyFetch(format!("certificate for \"{}\" could not be parsed: {err}", checked.kid))
		})?;
		let mut validation = Validation::new(ALGORITHM);

		validation.leeway = 0;
		validation.set_audience(&[checked.project_id.as_str()]);
		validation.set_issuer(&[checked.issuer.as_str()]);
		validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

		let data = jsonwebtoken::decode::<Map<String, Value>>(token, &decoding_key, &validation)
			.map_err(|err| match err.kind() {
				ErrorKind::ExpiredSignature => Error::TokenExpired,
				_ => Error::InvalidSignature,
			})?;

		Ok(DecodedIdToken::from_payload(data.claims))
	}

	/// Ordered structural checks; the first failure wins.
	fn check_locally(&self, token: &str) -> Result<LocallyChecked> {
		let Some(project_id) = self.credential.project_id() else {
			return Err(Error::VerifierNotConfigured);
		};

		if token.trim().is_empty() {
			return Err(Error::MalformedToken);
		}

		let unverified = decode::decode_unverified(token)?;
		let kid = match unverified.header.get("kid") {
			None => return Err(classify_missing_kid(&unverified)),
			Some(Value::String(kid)) => kid,
			Some(other) => {
				return Err(Error::Decode(format!(
					"\"kid\" header must be a string, found {other}"
				)));
			},
		};
		let algorithm = unverified.algorithm().unwrap_or_default();

		if algorithm != EXPECTED_ALGORITHM {
			return Err(Error::AlgorithmMismatch {
				expected: EXPECTED_ALGORITHM,
				actual: algorithm.to_owned(),
			});
		}

		let audience = claim_display(unverified.payload.get("aud"));

		if audience != project_id {
			return Err(Error::AudienceMismatch { expected: project_id.to_owned(), actual: audience });
		}

		let issuer = self.keys.config().issuer_for(project_id);
		let actual_issuer = claim_display(unverified.payload.get("iss"));

		if actual_issuer != issuer {
			return Err(Error::IssuerMismatch { expected: issuer, actual: actual_issuer });
		}

		let Some(Value::String(subject)) = unverified.payload.get("sub") else {
			return Err(Error::SubjectInvalid("no \"sub\" (subject) claim"));
		};

		if subject.is_empty() {
			return Err(Error::SubjectInvalid("an empty string \"sub\" (subject) claim"));
		}
		if subject.chars().count() > MAX_UID_LENGTH {
			return Err(Error::SubjectInvalid(
				"\"sub\" (subject) claim longer than 128 characters",
			));
		}

		Ok(LocallyChecked { kid: kid.to_owned(), project_id: project_id.to_owned(), issuer })
	}
}
impl Debug for TokenGenerator {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("TokenGenerator")
			.field("credential", &self.credential)
			.field("keys", &self.keys)
			.finish_non_exhaustive()
	}
}

struct LocallyChecked {
	kid: String,
	project_id: String,
	issuer: String,
}

fn classify_missing_kid(unverified: &UnverifiedToken) -> Error {
	if unverified.claim_str("aud") == Some(CUSTOM_TOKEN_AUDIENCE) {
		return Error::WrongTokenType(WrongTokenKind::CustomToken);
	}

	let legacy = unverified.algorithm() == Some(LEGACY_ALGORITHM)
		&& unverified.payload.get("v").and_then(Value::as_f64) == Some(0.0)
		&& unverified
			.payload
			.get("d")
			.and_then(Value::as_object)
			.is_some_and(|data| data.contains_key("uid"));

	if legacy {
		Error::WrongTokenType(WrongTokenKind::LegacyCustomToken)
	} else {
		Error::MissingKeyId
	}
}

fn claim_display(value: Option<&Value>) -> String {
	match value {
		Some(Value::String(value)) => value.clone(),
		Some(other) => other.to_string(),
		None => String::new(),
	}
}

//! Custom token minting verified with the service account's public key.

// std
use std::collections::HashMap;
// crates.io
use firebase_auth_token::{Credential, CredentialSource, Error, Result, TokenGenerator};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Value, json};
// self
use crate::support::{CLIENT_EMAIL, PRIVATE_KEY, PUBLIC_KEY, credential};

const AUDIENCE: &str =
	"https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

#[derive(Clone, Debug, Deserialize)]
struct Payload {
	uid: String,
	claims: Option<HashMap<String, Value>>,
	aud: String,
	iss: String,
	sub: String,
	iat: i64,
	exp: i64,
}

fn decode(token: &str) -> Payload {
	let mut validation = Validation::new(Algorithm::RS256);

	validation.set_audience(&[AUDIENCE]);
	validation.set_issuer(&[CLIENT_EMAIL]);

	jsonwebtoken::decode::<Payload>(
		token,
		&DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).expect("public key"),
		&validation,
	)
	.expect("custom token verifies with the service account key")
	.claims
}

#[test]
fn signs_uid_and_developer_claims() -> Result<()> {
	let credential = Credential::from_json(&json!({
		"private_key": PRIVATE_KEY,
		"client_email": CLIENT_EMAIL,
	}))?;
	let generator = TokenGenerator::new(credential)?;
	let token = generator.create_custom_token_with_claims("user-42", &json!({"role": "admin"}))?;
	let payload = decode(&token);

	assert_eq!(payload.uid, "user-42");
	assert_eq!(payload.claims, Some(HashMap::from([("role".to_owned(), json!("admin"))])));
	assert_eq!(payload.aud, AUDIENCE);
	assert_eq!(payload.iss, CLIENT_EMAIL);
	assert_eq!(payload.sub, CLIENT_EMAIL);
	assert_eq!(payload.exp - payload.iat, 3600);
	assert!((payload.iat - chrono::Utc::now().timestamp()).abs() <= 5);

	Ok(())
}

#[test]
fn uid_boundaries() -> Result<()> {
	let generator = TokenGenerator::new(credential(None))?;

	for uid in ["a".to_owned(), "u".repeat(128)] {
		let payload = decode(&generator.create_custom_token(&uid)?);

		assert_eq!(payload.uid, uid);
		assert!(payload.claims.is_none());
	}

	assert!(matches!(generator.create_custom_token(""), Err(Error::InvalidUid(_))));
	assert!(matches!(generator.create_custom_token(&"u".repeat(129)), Err(Error::InvalidUid(_))));

	Ok(())
}

#[test]
fn reserved_claims_are_refused() -> Result<()> {
	let generator = TokenGenerator::new(credential(None))?;

	for claim in ["aud", "exp", "iss", "nonce", "auth_time"] {
		assert!(matches!(
			generator.create_custom_token_with_claims("user", &json!({ claim: 1 })),
			Err(Error::ReservedClaim { claim: ref rejected }) if rejected == claim
		));
	}

	Ok(())
}

#[test]
fn empty_private_key_is_an_invalid_credential() {
	let source = CredentialSource::Inline(json!({"private_key": "", "client_email": "a@b.com"}));

	assert!(matches!(source.resolve(), Err(Error::CredentialInvalid(_))));
}

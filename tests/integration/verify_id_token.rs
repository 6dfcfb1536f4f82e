//! End-to-end ID token verification against mocked certificates.

// crates.io
use firebase_auth_token::{Error, Result, TokenGenerator, WrongTokenKind};
use serde_json::json;
use wiremock::MockServer;
// self
use crate::support::{
	OTHER_PRIVATE_KEY, OTHER_PUBLIC_KEY, PRIVATE_KEY, PROJECT_ID, PUBLIC_KEY, credential,
	id_token_claims, mount_certificates, sign_id_token, verifier,
};

fn generator(server: &MockServer, project_id: &str) -> TokenGenerator {
	TokenGenerator::with_config(credential(Some(project_id)), verifier(server)).expect("generator")
}

#[tokio::test]
async fn verifies_a_valid_id_token() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	mount_certificates(&server, &[("k1", PUBLIC_KEY), ("k2", OTHER_PUBLIC_KEY)], Some(3600), 1)
		.await;

	let generator = generator(&server, PROJECT_ID);
	let first = sign_id_token(PRIVATE_KEY, "k1", &id_token_claims(PROJECT_ID));
	let second = sign_id_token(OTHER_PRIVATE_KEY, "k2", &id_token_claims(PROJECT_ID));
	let decoded = generator.verify_id_token(&first).await?;

	assert_eq!(decoded.uid, "alice");
	assert_eq!(decoded.get("uid"), Some(&json!("alice")));
	assert_eq!(decoded.get("email"), Some(&json!("alice@example.com")));
	assert_eq!(decoded.audience(), Some(PROJECT_ID));
	assert!(decoded.auth_time().is_some());
	assert_eq!(generator.verify_id_token(&second).await?.uid, "alice");

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn unknown_kid_is_reported() {
	let server = MockServer::start().await;

	mount_certificates(&server, &[("k1", PUBLIC_KEY)], Some(3600), 1).await;

	let token = sign_id_token(PRIVATE_KEY, "rotated-away", &id_token_claims(PROJECT_ID));
	let err = generator(&server, PROJECT_ID).verify_id_token(&token).await;

	assert!(matches!(err, Err(Error::UnknownKeyId { ref kid }) if kid == "rotated-away"));
}

#[tokio::test]
async fn expired_token_is_reported() {
	let server = MockServer::start().await;

	mount_certificates(&server, &[("k1", PUBLIC_KEY)], Some(3600), 1).await;

	let mut claims = id_token_claims(PROJECT_ID);
	let past = chrono::Utc::now().timestamp() - 3600;

	claims.insert("iat".into(), json!(past - 3600));
	claims.insert("exp".into(), json!(past));

	let token = sign_id_token(PRIVATE_KEY, "k1", &claims);

	assert!(matches!(
		generator(&server, PROJECT_ID).verify_id_token(&token).await,
		Err(Error::TokenExpired)
	));
}

#[tokio::test]
async fn signature_from_another_key_is_rejected() {
	let server = MockServer::start().await;

	mount_certificates(&server, &[("k1", PUBLIC_KEY)], Some(3600), 1).await;

	let forged = sign_id_token(OTHER_PRIVATE_KEY, "k1", &id_token_claims(PROJECT_ID));

	assert!(matches!(
		generator(&server, PROJECT_ID).verify_id_token(&forged).await,
		Err(Error::InvalidSignature)
	));
}

#[tokio::test]
async fn local_failures_never_touch_the_network() {
	let server = MockServer::start().await;

	mount_certificates(&server, &[("k1", PUBLIC_KEY)], Some(3600), 0).await;

	let generator = generator(&server, "project-b");
	let other_project = sign_id_token(PRIVATE_KEY, "k1", &id_token_claims("project-a"));
	let custom_token = generator.create_custom_token("user-42").expect("custom token");

	assert!(matches!(
		generator.verify_id_token(&other_project).await,
		Err(Error::AudienceMismatch { ref expected, ref actual })
			if expected == "project-b" && actual == "project-a"
	));
	// The service account carries a key id, so its custom tokens fail on audience.
	assert!(matches!(
		generator.verify_id_token(&custom_token).await,
		Err(Error::AudienceMismatch { .. })
	));
	assert!(matches!(generator.verify_id_token("").await, Err(Error::MalformedToken)));
	assert!(matches!(generator.verify_id_token("garbage").await, Err(Error::Decode(_))));

	server.verify().await;
}

#[tokio::test]
async fn custom_token_without_key_id_is_the_wrong_token_type() {
	let server = MockServer::start().await;
	let credential = credential(Some(PROJECT_ID)).with_private_key_id(None);
	let generator =
		TokenGenerator::with_config(credential, verifier(&server)).expect("generator");
	let custom_token = generator.create_custom_token("user-42").expect("custom token");
	let err = generator.verify_id_token(&custom_token).await.expect_err("custom token");

	assert!(matches!(err, Error::WrongTokenType(WrongTokenKind::CustomToken)));
	assert!(err.to_string().contains("was given a custom token"));
}

#[tokio::test]
async fn certificate_outage_fails_verification() {
	let server = MockServer::start().await;
	let generator = generator(&server, PROJECT_ID);
	let token = sign_id_token(PRIVATE_KEY, "k1", &id_token_claims(PROJECT_ID));

	// Nothing is mounted, so the endpoint answers 404.
	assert!(matches!(generator.verify_id_token(&token).await, Err(Error::KeyFetch(_))));
}

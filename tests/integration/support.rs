//! Fixtures shared by the integration tests.

// crates.io
use firebase_auth_token::{Credential, VerifierConfig};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Map, Value, json};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};

pub const PROJECT_ID: &str = "demo-project";
pub const CLIENT_EMAIL: &str = "svc@demo-project.iam.gserviceaccount.com";
pub const PRIVATE_KEY: &str = include_str!("../fixtures/service_account_key.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/service_account_pub.pem");
pub const OTHER_PRIVATE_KEY: &str = include_str!("../fixtures/other_key.pem");
pub const OTHER_PUBLIC_KEY: &str = include_str!("../fixtures/other_pub.pem");
pub const CERTS_PATH: &str = "/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

pub fn service_account(project_id: Option<&str>) -> Value {
	let mut account = json!({
		"type": "service_account",
		"private_key_id": "sa-key",
		"private_key": PRIVATE_KEY,
		"client_email": CLIENT_EMAIL,
	});

	if let Some(project_id) = project_id {
		account["project_id"] = json!(project_id);
	}

	account
}

pub fn credential(project_id: Option<&str>) -> Credential {
	Credential::from_json(&service_account(project_id)).expect("credential")
}

/// Verifier pointed at the mock certificate endpoint over plain HTTP.
pub fn verifier(server: &MockServer) -> VerifierConfig {
	VerifierConfig::default()
		.with_cert_url(format!("{}{CERTS_PATH}", server.uri()))
		.with_require_https(false)
}

/// Claims of a well-formed ID token for `project_id`, valid for ten minutes.
pub fn id_token_claims(project_id: &str) -> Map<String, Value> {
	let now = chrono::Utc::now().timestamp();

	json!({
		"aud": project_id,
		"iss": format!("https://securetoken.google.com/{project_id}"),
		"sub": "alice",
		"iat": now,
		"auth_time": now,
		"exp": now + 600,
		"email": "alice@example.com",
	})
	.as_object()
	.cloned()
	.expect("object")
}

pub fn sign_id_token(private_key: &str, kid: &str, claims: &Map<String, Value>) -> String {
	let mut header = Header::new(Algorithm::RS256);

	header.kid = Some(kid.into());

	jsonwebtoken::encode(
		&header,
		claims,
		&EncodingKey::from_rsa_pem(private_key.as_bytes()).expect("signing key"),
	)
	.expect("sign")
}

pub fn certificates(keys: &[(&str, &str)]) -> Value {
	Value::Object(keys.iter().map(|(kid, pem)| ((*kid).to_owned(), json!(pem))).collect())
}

pub fn certificate_response(keys: &[(&str, &str)], max_age: Option<u64>) -> ResponseTemplate {
	let response = ResponseTemplate::new(200).set_body_json(certificates(keys));

	match max_age {
		Some(max_age) => response
			.insert_header("cache-control", format!("public, max-age={max_age}, must-revalidate")),
		None => response,
	}
}

/// Mount a certificate endpoint expected to be hit exactly `calls` times.
pub async fn mount_certificates(
	server: &MockServer,
	keys: &[(&str, &str)],
	max_age: Option<u64>,
	calls: u64,
) {
	Mock::given(method("GET"))
		.and(path(CERTS_PATH))
		.respond_with(certificate_response(keys, max_age))
		.expect(calls)
		.mount(server)
		.await;
}

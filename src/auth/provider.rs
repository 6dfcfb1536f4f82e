//! Sources of third-party access tokens consumed by [`Auth::get_token`](crate::Auth::get_token).

// std
use std::{
	fmt::{Debug, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
};
// crates.io
use http::header::ACCEPT;
use jsonwebtoken::{EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use url::Url;
// self
use crate::{_prelude::*, credential::Credential, http::client, token::claims::ALGORITHM};

/// OAuth2 endpoint exchanging a signed assertion for an access token.
pub const DEFAULT_TOKEN_URI: &str = "https://accounts.google.com/o/oauth2/token";
/// Grant type of the JWT-bearer assertion flow.
pub const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Scopes requested by [`ServiceAccountTokenProvider`] unless overridden.
pub const DEFAULT_SCOPES: [&str; 4] = [
	"https://www.googleapis.com/auth/firebase.database",
	"https://www.googleapis.com/auth/firebase.messaging",
	"https://www.googleapis.com/auth/identitytoolkit",
	"https://www.googleapis.com/auth/userinfo.email",
];

/// Per-request timeout for token exchanges unless overridden.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const ASSERTION_TTL_SECS: i64 = 3600;

/// Future returned by [`AccessTokenProvider::access_token`].
pub type ProviderFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Value>>> + Send + 'a>>;

/// Produces raw access-token responses shaped like `{"access_token": "...", "expires_in": 3600}`.
///
/// `Ok(None)` means the provider has no token to offer; the shape of `Some` values is validated by
/// the caller.
pub trait AccessTokenProvider: Send + Sync {
	/// Obtain a fresh access-token response.
	fn access_token(&self) -> ProviderFuture<'_>;
}

/// Provider used when no credential is configured; never yields a token.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnauthenticatedProvider;
impl AccessTokenProvider for UnauthenticatedProvider {
	fn access_token(&self) -> ProviderFuture<'_> {
		Box::pin(async { Ok(None) })
	}
}

/// Exchanges a service-account-signed assertion for an OAuth2 access token.
#[derive(Clone)]
pub struct ServiceAccountTokenProvider {
	credential: Arc<Credential>,
	encoding_key: Arc<EncodingKey>,
	token_uri: Url,
	scopes: Vec<String>,
	request_timeout: Duration,
	client: Client,
}
impl ServiceAccountTokenProvider {
	/// Build a provider targeting Google's token endpoint with the default scopes.
	pub fn new(credential: Credential) -> Result<Self> {
		let encoding_key = credential.encoding_key()?;
		let token_uri = parse_token_uri(DEFAULT_TOKEN_URI)?;

		Ok(Self {
			credential: Arc::new(credential),
			encoding_key: Arc::new(encoding_key),
			token_uri,
			scopes: DEFAULT_SCOPES.iter().map(|scope| (*scope).to_owned()).collect(),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			client: client::build_client()?,
		})
	}

	/// Override the token endpoint.
	pub fn with_token_uri(mut self, token_uri: &str) -> Result<Self> {
		self.token_uri = parse_token_uri(token_uri)?;

		Ok(self)
	}

	/// Override the requested scopes.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Override the per-request timeout.
	pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
		self.request_timeout = request_timeout;

		self
	}

	/// Use the supplied HTTP client.
	pub fn with_client(mut self, client: Client) -> Self {
		self.client = client;

		self
	}

	fn assertion(&self) -> Result<String> {
		let iat = Utc::now().timestamp();
		let claims = AssertionClaims {
			iss: self.credential.client_email(),
			scope: self.scopes.join(" "),
			aud: self.token_uri.as_str(),
			iat,
			exp: iat + ASSERTION_TTL_SECS,
		};

		Ok(jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)?)
	}

	async fn exchange(&self) -> Result<Option<Value>> {
		let assertion = self.assertion()?;
		let response = self
			.client
			.post(self.token_uri.clone())
			.header(ACCEPT, "application/json")
			.form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
			.timeout(self.request_timeout)
			.send()
			.await
			.map_err(|err| {
				Error::AccessTokenFetch(format!("request to {} failed: {err}", self.token_uri))
			})?;
		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|err| Error::AccessTokenFetch(format!("reading token response: {err}")))?;

		if !status.is_success() {
			return Err(Error::AccessTokenFetch(format!(
				"token endpoint returned {status}: {body}"
			)));
		}

		let value = serde_json::from_str::<Value>(&body).map_err(|err| {
			Error::AccessTokenFetch(format!("token response is not valid JSON: {err}"))
		})?;

		tracing::debug!(
			client_email = self.credential.client_email(),
			status = %status,
			"access token obtained"
		);

		Ok(Some(value))
	}
}
impl AccessTokenProvider for ServiceAccountTokenProvider {
	fn access_token(&self) -> ProviderFuture<'_> {
		Box::pin(self.exchange())
	}
}
impl Debug for ServiceAccountTokenProvider {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("ServiceAccountTokenProvider")
			.field("client_email", &self.credential.client_email())
			.field("token_uri", &self.token_uri.as_str())
			.field("scopes", &self.scopes)
			.field("request_timeout", &self.request_timeout)
			.finish_non_exhaustive()
	}
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
	iss: &'a str,
	scope: String,
	aud: &'a str,
	iat: i64,
	exp: i64,
}

fn parse_token_uri(raw: &str) -> Result<Url> {
	Url::parse(raw).map_err(|err| Error::Validation {
		field: "token_uri",
		reason: format!("Failed to parse URL: {err}."),
	})
}

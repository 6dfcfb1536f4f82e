//! HTTP client integration for certificate retrieval.

// crates.io
use http::{HeaderMap, StatusCode, header::ACCEPT};
use reqwest::{Client, redirect::Policy};
use serde_json::{Map, Value};
use url::Url;
// self
use crate::{_prelude::*, cache::state::PublicKeySet, config::VerifierConfig, http::semantics};

/// Maximum redirect depth followed by clients from [`build_client`].
pub const MAX_REDIRECTS: usize = 10;
/// Connect timeout applied by clients from [`build_client`].
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the reqwest client shared by the certificate and token endpoints.
pub fn build_client() -> Result<Client> {
	Client::builder()
		.redirect(Policy::limited(MAX_REDIRECTS))
		.user_agent(format!("firebase-auth-token/{}", env!("CARGO_PKG_VERSION")))
		.connect_timeout(CONNECT_TIMEOUT)
		.build()
		.map_err(|err| Error::Validation {
			field: "http_client",
			reason: format!("Failed to build HTTP client: {err}."),
		})
}

/// Result of a certificate fetch.
#[derive(Clone, Debug)]
pub struct CertificateFetch {
	/// Parsed key set.
	pub keys: PublicKeySet,
	/// `max-age` advertised by the origin, if any.
	pub max_age: Option<Duration>,
	/// Response headers, kept for diagnostics.
	pub headers: HeaderMap,
	/// Response status.
	pub status: StatusCode,
	/// Round-trip duration of the exchange.
	pub elapsed: Duration,
}

/// Issue one GET against the certificate endpoint and parse the response.
///
/// Every failure, including transport errors, surfaces as [`Error::KeyFetch`].
pub async fn fetch_public_keys(
	client: &Client,
	url: &Url,
	config: &VerifierConfig,
) -> Result<CertificateFetch> {
	if config.require_https {
		crate::config::enforce_https(url)?;
	}

	let start = Instant::now();
	let response = client
		.get(url.clone())
		.header(ACCEPT, "application/json")
		.timeout(config.request_timeout)
		.send()
		.await
		.map_err(|err| Error::KeyFetch(format!("request to {url} failed: {err}")))?;
	let status = response.status();
	let headers = response.headers().clone();
	let bytes = response
		.bytes()
		.await
		.map_err(|err| Error::KeyFetch(format!("reading response from {url} failed: {err}")))?;
	let elapsed = start.elapsed();

	if bytes.len() as u64 > config.max_response_bytes {
		return Err(Error::KeyFetch(format!(
			"response size {size} bytes exceeds the configured guard of {limit} bytes",
			size = bytes.len(),
			limit = config.max_response_bytes
		)));
	}

	let body = match serde_json::from_slice::<Value>(&bytes) {
		Ok(body) => body,
		Err(_) if !status.is_success() => {
			return Err(Error::KeyFetch(format!("upstream HTTP status {status} from {url}")));
		},
		Err(err) => return Err(Error::KeyFetch(format!("response is not valid JSON: {err}"))),
	};
	let Value::Object(fields) = body else {
		return Err(Error::KeyFetch("response is not a JSON object".into()));
	};

	if let Some(message) = provider_error(&fields) {
		return Err(Error::KeyFetch(message));
	}
	if !status.is_success() {
		return Err(Error::KeyFetch(format!("upstream HTTP status {status} from {url}")));
	}

	let keys = parse_key_set(fields)?;
	let max_age = semantics::max_age(&headers);

	tracing::debug!(
		url = %url,
		status = %status,
		elapsed = ?elapsed,
		keys = keys.len(),
		cache_control = ?semantics::cache_control_header(&headers),
		"certificate fetch complete"
	);

	Ok(CertificateFetch { keys, max_age, headers, status, elapsed })
}

/// Error description embedded in the response body, e.g. `{"error": "...", "error_description": "..."}`.
fn provider_error(fields: &Map<String, Value>) -> Option<String> {
	let error = fields.get("error").filter(|value| !value.is_null())?;
	let mut message = match error {
		Value::String(error) => error.clone(),
		other => other.to_string(),
	};

	if let Some(description) = fields.get("error_description").and_then(Value::as_str) {
		message.push_str(&format!(" ({description})"));
	}

	Some(message)
}

fn parse_key_set(fields: Map<String, Value>) -> Result<PublicKeySet> {
	fields
		.into_iter()
		.map(|(kid, value)| match value {
			Value::String(pem) => Ok((kid, pem)),
			_ => Err(Error::KeyFetch(format!("key \"{kid}\" is not a PEM string"))),
		})
		.collect::<Result<Vec<_>>>()
		.map(|pairs| pairs.into_iter().collect())
}

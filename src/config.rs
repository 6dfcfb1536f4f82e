//! Verifier configuration and validation.

// crates.io
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::_prelude::*;

/// Google endpoint publishing the certificates that sign Firebase ID tokens.
pub const DEFAULT_CERT_URL: &str =
	"https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";
/// Issuer prefix of Firebase ID tokens; the project id is appended.
pub const DEFAULT_ISSUER_PREFIX: &str = "https://securetoken.google.com/";
/// Default per-request timeout for certificate fetches.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default size guard (1 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 1_048_576;
/// Lower bound accepted for `request_timeout`.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_millis(100);

/// Where and how ID token signing keys are retrieved, and which issuer they vouch for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
	/// URL of the certificate endpoint returning `{kid: PEM}`.
	#[serde(default = "default_cert_url")]
	pub cert_url: String,
	/// Prefix of the expected `iss` claim; the project id is appended.
	#[serde(default = "default_issuer_prefix")]
	pub issuer_prefix: String,
	/// Whether the certificate endpoint must be served over HTTPS.
	#[serde(default = "default_true")]
	pub require_https: bool,
	/// Timeout applied to each certificate fetch.
	#[serde(default = "default_request_timeout")]
	pub request_timeout: Duration,
	/// Maximum size allowed for the certificate response in bytes.
	#[serde(default = "default_max_response_bytes")]
	pub max_response_bytes: u64,
}
impl VerifierConfig {
	/// Override the certificate endpoint.
	pub fn with_cert_url(mut self, cert_url: impl Into<String>) -> Self {
		self.cert_url = cert_url.into();

		self
	}

	/// Override the issuer prefix.
	pub fn with_issuer_prefix(mut self, issuer_prefix: impl Into<String>) -> Self {
		self.issuer_prefix = issuer_prefix.into();

		self
	}

	/// Set HTTPS requirement to the desired value.
	pub fn with_require_https(mut self, require_https: bool) -> Self {
		self.require_https = require_https;

		self
	}

	/// Override the per-request timeout.
	pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
		self.request_timeout = request_timeout;

		self
	}

	/// Expected `iss` claim for ID tokens of the given project.
	pub fn issuer_for(&self, project_id: &str) -> String {
		format!("{}{project_id}", self.issuer_prefix)
	}

	/// Parse the certificate endpoint, enforcing HTTPS when required.
	pub fn cert_url(&self) -> Result<Url> {
		let url = Url::parse(&self.cert_url).map_err(|err| Error::Validation {
			field: "cert_url",
			reason: format!("Failed to parse URL: {err}."),
		})?;

		if self.require_https {
			enforce_https(&url)?;
		}
		if url.host_str().is_none() {
			return Err(Error::Validation {
				field: "cert_url",
				reason: "Must include a host component.".into(),
			});
		}

		Ok(url)
	}

	/// Validate the configuration against the documented constraints.
	pub fn validate(&self) -> Result<()> {
		self.cert_url()?;

		if self.issuer_prefix.trim().is_empty() {
			return Err(Error::Validation {
				field: "issuer_prefix",
				reason: "Must not be empty.".into(),
			});
		}
		if self.request_timeout < MIN_REQUEST_TIMEOUT {
			return Err(Error::Validation {
				field: "request_timeout",
				reason: format!("Must be at least {MIN_REQUEST_TIMEOUT:?}."),
			});
		}
		if self.max_response_bytes == 0 {
			return Err(Error::Validation {
				field: "max_response_bytes",
				reason: "Must be greater than zero.".into(),
			});
		}

		Ok(())
	}
}
impl Default for VerifierConfig {
	fn default() -> Self {
		Self {
			cert_url: default_cert_url(),
			issuer_prefix: default_issuer_prefix(),
			require_https: true,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
		}
	}
}

/// Ensure the provided URL uses HTTPS.
pub fn enforce_https(url: &Url) -> Result<()> {
	if url.scheme() == "https" {
		Ok(())
	} else {
		Err(Error::Validation {
			field: "cert_url",
			reason: format!("Upstream URL {url} must use HTTPS."),
		})
	}
}

fn default_cert_url() -> String {
	DEFAULT_CERT_URL.into()
}

fn default_issuer_prefix() -> String {
	DEFAULT_ISSUER_PREFIX.into()
}

fn default_true() -> bool {
	true
}

fn default_request_timeout() -> Duration {
	DEFAULT_REQUEST_TIMEOUT
}

fn default_max_response_bytes() -> u64 {
	DEFAULT_MAX_RESPONSE_BYTES
}

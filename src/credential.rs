//! Service account resolution.
//!
//! A [`CredentialSource`] names where the service account comes from; [`CredentialSource::resolve`]
//! turns it, once, into an immutable [`Credential`].

// std
use std::{
	ffi::OsString,
	fmt::{Debug, Formatter, Result as FmtResult},
	fs,
	path::{Path, PathBuf},
};
// crates.io
use jsonwebtoken::EncodingKey;
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Environment variable consulted by [`CredentialSource::EnvironmentDefault`].
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Where a service account is loaded from.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CredentialSource {
	/// JSON key file on disk.
	FilePath(PathBuf),
	/// In-memory JSON object using snake_case or camelCase field names.
	Inline(Value),
	/// Path taken from `GOOGLE_APPLICATION_CREDENTIALS`; absent when the variable is unset.
	#[default]
	EnvironmentDefault,
}
impl CredentialSource {
	/// Resolve the source into a credential.
	///
	/// Returns `Ok(None)` only for [`CredentialSource::EnvironmentDefault`] when the environment
	/// variable is unset.
	pub fn resolve(&self) -> Result<Option<Credential>> {
		match self {
			Self::FilePath(path) => load_file(path).map(Some),
			Self::Inline(value) => Credential::from_json(value).map(Some),
			Self::EnvironmentDefault => resolve_environment(std::env::var_os(CREDENTIALS_ENV_VAR)),
		}
	}
}
impl From<PathBuf> for CredentialSource {
	fn from(path: PathBuf) -> Self {
		Self::FilePath(path)
	}
}
impl From<&Path> for CredentialSource {
	fn from(path: &Path) -> Self {
		Self::FilePath(path.to_path_buf())
	}
}
impl From<Value> for CredentialSource {
	fn from(value: Value) -> Self {
		Self::Inline(value)
	}
}

/// Canonical service account: signing key, issuer email, and optional project.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
	project_id: Option<String>,
	private_key_id: Option<String>,
	private_key: String,
	client_email: String,
}
impl Credential {
	/// Build a credential, rejecting an empty private key or client email.
	pub fn new(
		project_id: Option<String>,
		private_key: impl Into<String>,
		client_email: impl Into<String>,
	) -> Result<Self> {
		let private_key = private_key.into();
		let client_email = client_email.into();

		if private_key.is_empty() {
			return Err(missing_field("private_key"));
		}
		if client_email.is_empty() {
			return Err(missing_field("client_email"));
		}

		Ok(Self {
			project_id: project_id.filter(|id| !id.is_empty()),
			private_key_id: None,
			private_key,
			client_email,
		})
	}

	/// Normalise a JSON service account object.
	pub fn from_json(value: &Value) -> Result<Self> {
		let Value::Object(fields) = value else {
			return Err(Error::CredentialInvalid("Invalid service account provided.".into()));
		};
		let project_id = optional_string(fields, "project_id", "projectId");
		let private_key_id = optional_string(fields, "private_key_id", "privateKeyId");
		let private_key = required_string(fields, "private_key", "privateKey")?;
		let client_email = required_string(fields, "client_email", "clientEmail")?;

		Ok(Self::new(project_id, private_key, client_email)?.with_private_key_id(private_key_id))
	}

	/// Attach the id of the private key, stamped as `kid` on minted tokens.
	pub fn with_private_key_id(mut self, private_key_id: Option<String>) -> Self {
		self.private_key_id = private_key_id.filter(|id| !id.is_empty());

		self
	}

	/// Project the credential belongs to, required for ID token verification.
	pub fn project_id(&self) -> Option<&str> {
		self.project_id.as_deref()
	}

	/// Id of the private key, if known.
	pub fn private_key_id(&self) -> Option<&str> {
		self.private_key_id.as_deref()
	}

	/// Service account email used as issuer and subject of custom tokens.
	pub fn client_email(&self) -> &str {
		&self.client_email
	}

	/// PEM encoded RSA private key.
	pub fn private_key(&self) -> &str {
		&self.private_key
	}

	/// Parse the private key for RS256 signing.
	pub fn encoding_key(&self) -> Result<EncodingKey> {
		EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|err| {
			Error::CredentialInvalid(format!(
				"Service account \"private_key\" is not a valid RSA PEM key: {err}."
			))
		})
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("Credential")
			.field("project_id", &self.project_id)
			.field("private_key_id", &self.private_key_id)
			.field("private_key", &"<redacted>")
			.field("client_email", &self.client_email)
			.finish()
	}
}

fn resolve_environment(path: Option<OsString>) -> Result<Option<Credential>> {
	match path {
		Some(path) => load_file(Path::new(&path)).map(Some),
		None => {
			tracing::debug!(env = CREDENTIALS_ENV_VAR, "no service account configured");

			Ok(None)
		},
	}
}

fn load_file(path: &Path) -> Result<Credential> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::CredentialParse(format!("{}: {err}", path.display())))?;
	let value = serde_json::from_str::<Value>(&raw)
		.map_err(|err| Error::CredentialParse(format!("{}: {err}", path.display())))?;
	let credential = Credential::from_json(&value)?;

	tracing::debug!(
		path = %path.display(),
		client_email = credential.client_email(),
		project_id = credential.project_id(),
		"loaded service account"
	);

	Ok(credential)
}

/// Snake_case spelling wins unless it is missing, `null`, or empty.
fn pick<'a>(fields: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a Value> {
	let is_set = |value: &&Value| !value.is_null() && value.as_str() != Some("");

	fields.get(snake).filter(is_set).or_else(|| fields.get(camel))
}

fn optional_string(fields: &Map<String, Value>, snake: &str, camel: &str) -> Option<String> {
	pick(fields, snake, camel).and_then(Value::as_str).map(str::to_owned)
}

fn required_string(
	fields: &Map<String, Value>,
	snake: &'static str,
	camel: &str,
) -> Result<String> {
	match pick(fields, snake, camel) {
		Some(Value::String(value)) if !value.is_empty() => Ok(value.clone()),
		_ => Err(missing_field(snake)),
	}
}

fn missing_field(field: &str) -> Error {
	Error::CredentialInvalid(format!("Service account must contain a \"{field}\" field."))
}

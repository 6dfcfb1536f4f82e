//! Auth facade binding a credential to token minting, verification, and a cached access token.

pub mod provider;

// std
use std::{
	fmt::{Debug, Formatter, Result as FmtResult},
	sync::{Mutex, MutexGuard, PoisonError},
};
// crates.io
use serde::Serialize;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::provider::{AccessTokenProvider, ServiceAccountTokenProvider, UnauthenticatedProvider},
	config::VerifierConfig,
	credential::CredentialSource,
	token::{claims::DecodedIdToken, generator::TokenGenerator},
};

type TokenListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Construction options for [`Auth`].
#[derive(Clone)]
pub struct AuthOptions {
	/// Where the signing service account comes from; `None` disables minting and verification.
	pub credential: Option<CredentialSource>,
	/// Access-token provider; defaults to one derived from the service account.
	pub access_token_provider: Option<Arc<dyn AccessTokenProvider>>,
	/// Certificate endpoint and issuer used for ID token verification.
	pub verifier: VerifierConfig,
}
impl AuthOptions {
	/// Use the given credential source.
	pub fn with_credential(mut self, source: impl Into<CredentialSource>) -> Self {
		self.credential = Some(source.into());

		self
	}

	/// Run without a signing credential.
	pub fn without_credential(mut self) -> Self {
		self.credential = None;

		self
	}

	/// Use an external access-token provider.
	pub fn with_access_token_provider(mut self, provider: Arc<dyn AccessTokenProvider>) -> Self {
		self.access_token_provider = Some(provider);

		self
	}

	/// Override the verifier configuration.
	pub fn with_verifier(mut self, verifier: VerifierConfig) -> Self {
		self.verifier = verifier;

		self
	}
}
impl Default for AuthOptions {
	fn default() -> Self {
		Self {
			credential: Some(CredentialSource::EnvironmentDefault),
			access_token_provider: None,
			verifier: VerifierConfig::default(),
		}
	}
}
impl Debug for AuthOptions {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("AuthOptions")
			.field("credential", &self.credential)
			.field("access_token_provider", &self.access_token_provider.is_some())
			.field("verifier", &self.verifier)
			.finish()
	}
}

/// OAuth2 access token with an absolute expiry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	/// Bearer token value.
	pub access_token: String,
	/// Instant after which the token must be refreshed.
	pub expiration_time: DateTime<Utc>,
}
impl AccessToken {
	/// Validate a provider response and anchor its `expires_in` at `now`.
	pub fn from_response(response: &Value, now: DateTime<Utc>) -> Result<Self> {
		let invalid = || Error::InvalidAccessToken(response.to_string());
		let access_token =
			response.get("access_token").and_then(Value::as_str).ok_or_else(invalid)?;
		let expires_in = response.get("expires_in").and_then(Value::as_f64).ok_or_else(invalid)?;
		let millis = expires_in * 1000.0;

		// Out-of-range lifetimes would saturate the cast below.
		if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
			return Err(invalid());
		}

		let lifetime = TimeDelta::try_milliseconds(millis as i64).ok_or_else(invalid)?;
		let expiration_time = now.checked_add_signed(lifetime).ok_or_else(invalid)?;

		Ok(Self { access_token: access_token.to_owned(), expiration_time })
	}

	/// Whether the token had expired at `now`.
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		self.expiration_time < now
	}
}

/// Handle returned by [`Auth::add_token_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Listeners {
	next_id: u64,
	entries: Vec<(ListenerId, TokenListener)>,
}

/// Long-lived auth session bound to one resolved credential.
pub struct Auth {
	generator: Option<TokenGenerator>,
	provider: Arc<dyn AccessTokenProvider>,
	cached_token: Mutex<Option<AccessToken>>,
	listeners: Mutex<Listeners>,
}
impl Auth {
	/// Resolve the configured credential once and build the session.
	pub fn new(options: AuthOptions) -> Result<Self> {
		let credential = match options.credential {
			Some(source) => source.resolve()?,
			None => None,
		};
		let generator = credential
			.map(|credential| TokenGenerator::with_config(credential, options.verifier))
			.transpose()?;
		let provider: Arc<dyn AccessTokenProvider> =
			match (options.access_token_provider, &generator) {
				(Some(provider), _) => provider,
				(None, Some(generator)) =>
					Arc::new(ServiceAccountTokenProvider::new(generator.credential().clone())?),
				(None, None) => Arc::new(UnauthenticatedProvider),
			};

		tracing::debug!(signing = generator.is_some(), "auth session initialised");

		Ok(Self {
			generator,
			provider,
			cached_token: Mutex::new(None),
			listeners: Mutex::new(Listeners::default()),
		})
	}

	/// Token generator backing this session, if a service account was configured.
	pub fn token_generator(&self) -> Option<&TokenGenerator> {
		self.generator.as_ref()
	}

	/// Mint a custom token for `uid`.
	pub fn create_custom_token(&self, uid: &str) -> Result<String> {
		self.require_generator("create_custom_token")?.create_custom_token(uid)
	}

	/// Mint a custom token for `uid` carrying developer claims.
	pub fn create_custom_token_with_claims<T>(&self, uid: &str, claims: &T) -> Result<String>
	where
		T: Serialize + ?Sized,
	{
		self.require_generator("create_custom_token")?.create_custom_token_with_claims(uid, claims)
	}

	/// Verify a Firebase ID token.
	pub async fn verify_id_token(&self, token: &str) -> Result<DecodedIdToken> {
		self.require_generator("verify_id_token")?.verify_id_token(token).await
	}

	/// Return the cached access token, refreshing it when absent, expired, or forced.
	///
	/// Listeners are notified, in registration order, only when the refreshed token differs from
	/// the cached one.
	#[tracing::instrument(skip(self))]
	pub async fn get_token(&self, force_refresh: bool) -> Result<Option<AccessToken>> {
		if !force_refresh
			&& let Some(cached) = self.cached_token()
			&& !cached.is_expired(Utc::now())
		{
			return Ok(Some(cached));
		}

		let Some(response) = self.provider.access_token().await? else {
			tracing::debug!("access token provider returned no token");

			return Ok(None);
		};
		let token = AccessToken::from_response(&response, Utc::now())?;
		let changed = {
			let mut cached = lock(&self.cached_token);

			if cached.as_ref() == Some(&token) {
				false
			} else {
				*cached = Some(token.clone());

				true
			}
		};

		if changed {
			tracing::debug!(expiration_time = %token.expiration_time, "access token refreshed");

			self.notify(&token.access_token);
		}

		Ok(Some(token))
	}

	/// Register a listener called with each new access token.
	///
	/// If a token is already cached the listener is called once immediately.
	pub fn add_token_listener<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(&str) + Send + Sync + 'static,
	{
		let listener: TokenListener = Arc::new(listener);
		let id = {
			let mut listeners = lock(&self.listeners);
			let id = ListenerId(listeners.next_id);

			listeners.next_id += 1;
			listeners.entries.push((id, listener.clone()));

			id
		};

		if let Some(cached) = self.cached_token() {
			listener(&cached.access_token);
		}

		id
	}

	/// Unregister a listener; returns whether it was registered.
	pub fn remove_token_listener(&self, id: ListenerId) -> bool {
		let mut listeners = lock(&self.listeners);
		let before = listeners.entries.len();

		listeners.entries.retain(|(entry, _)| *entry != id);

		listeners.entries.len() != before
	}

	/// Release the session. No external resources are held; listeners are dropped.
	pub fn dispose(self) {
		let listeners = lock(&self.listeners).entries.len();

		tracing::debug!(listeners, "auth session disposed");
	}

	fn cached_token(&self) -> Option<AccessToken> {
		lock(&self.cached_token).clone()
	}

	fn notify(&self, access_token: &str) {
		let listeners = lock(&self.listeners)
			.entries
			.iter()
			.map(|(_, listener)| listener.clone())
			.collect::<Vec<_>>();

		for listener in listeners {
			listener(access_token);
		}
	}

	fn require_generator(&self, operation: &'static str) -> Result<&TokenGenerator> {
		self.generator.as_ref().ok_or(Error::NotConfigured { operation })
	}
}
impl Debug for Auth {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("Auth")
			.field("generator", &self.generator)
			.field("cached_token", &self.cached_token())
			.field("listeners", &lock(&self.listeners).entries.len())
			.finish()
	}
}

// A listener that panicked must not wedge the session.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

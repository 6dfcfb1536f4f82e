//! Key cache handling certificate retrieval and reuse.

// crates.io
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};
use url::Url;
// self
use crate::{
	_prelude::*,
	cache::state::{CacheState, KeySetPayload, PublicKeySet},
	config::VerifierConfig,
	http::{
		client::{self, fetch_public_keys},
		semantics,
	},
	metrics::KeyCacheMetrics,
};

/// Fetches and caches the trust anchor's public verification keys.
///
/// Reads inside the `max-age` window never touch the network. Once the window has passed, or when
/// the origin sent no `max-age`, the next read performs exactly one fetch whose result replaces the
/// cached set wholesale. Refreshes are serialised through a single-flight guard: callers that
/// queued behind an in-flight refresh reuse its result instead of issuing their own request.
#[derive(Clone, Debug)]
pub struct KeyCache {
	config: Arc<VerifierConfig>,
	url: Arc<Url>,
	client: Arc<Client>,
	state: Arc<RwLock<CacheState>>,
	single_flight: Arc<Mutex<()>>,
	metrics: Arc<KeyCacheMetrics>,
}
impl KeyCache {
	/// Build a new key cache with the default reqwest client.
	pub fn new(config: VerifierConfig) -> Result<Self> {
		Self::with_client(config, client::build_client()?)
	}

	/// Build a key cache using the supplied HTTP client.
	pub fn with_client(config: VerifierConfig, client: Client) -> Result<Self> {
		config.validate()?;

		let url = config.cert_url()?;

		Ok(Self {
			config: Arc::new(config),
			url: Arc::new(url),
			client: Arc::new(client),
			state: Arc::new(RwLock::new(CacheState::Empty)),
			single_flight: Arc::new(Mutex::new(())),
			metrics: KeyCacheMetrics::new(),
		})
	}

	/// Configuration the cache was built with.
	pub fn config(&self) -> &VerifierConfig {
		&self.config
	}

	/// Access the per-cache metrics accumulator.
	pub fn metrics(&self) -> Arc<KeyCacheMetrics> {
		self.metrics.clone()
	}

	/// Capture the current cache state for diagnostics.
	pub async fn snapshot(&self) -> CacheState {
		self.state.read().await.clone()
	}

	/// Drop the cached key set so the next read fetches again.
	pub async fn invalidate(&self) {
		*self.state.write().await = CacheState::Empty;

		tracing::debug!(url = %self.url, "key cache invalidated");
	}

	/// Return the cached key set while fresh, otherwise fetch and store a new one.
	#[tracing::instrument(skip(self), fields(url = %self.url))]
	pub async fn fetch(&self) -> Result<Arc<PublicKeySet>> {
		if let Some(keys) = self.fresh_keys().await {
			self.metrics.record_hit();

			return Ok(keys);
		}

		let _guard = self.single_flight.lock().await;

		// A refresh may have completed while this caller waited on the guard.
		if let Some(keys) = self.fresh_keys().await {
			self.metrics.record_hit();

			return Ok(keys);
		}

		self.metrics.record_miss();
		tracing::debug!("key cache empty or expired; fetching certificates");

		let started = Instant::now();

		match fetch_public_keys(&self.client, &self.url, &self.config).await {
			Ok(fetch) => {
				let now = Instant::now();
				let keys = Arc::new(fetch.keys);
				let payload = KeySetPayload {
					keys: keys.clone(),
					fetched_at: Utc::now(),
					expires_at: semantics::expires_at(now, fetch.max_age),
				};

				*self.state.write().await = CacheState::Ready(payload);

				self.metrics.record_fetch_success(started.elapsed());
				tracing::debug!(max_age = ?fetch.max_age, keys = keys.len(), "key cache replaced");

				Ok(keys)
			},
			Err(err) => {
				self.metrics.record_fetch_error();
				tracing::warn!(error = %err, "certificate fetch failed");

				Err(err)
			},
		}
	}

	async fn fresh_keys(&self) -> Option<Arc<PublicKeySet>> {
		self.state.read().await.fresh_keys(Instant::now())
	}
}

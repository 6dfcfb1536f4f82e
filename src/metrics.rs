//! Metrics helpers and per-cache telemetry bookkeeping.
//!
//! The atomic [`KeyCacheMetrics`] counters are always maintained. With the `metrics` feature the
//! same events are also emitted through the `metrics` facade, and the `prometheus` feature adds
//! [`install_default_exporter`].

// std
#[cfg(feature = "prometheus")] use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
#[cfg(feature = "metrics")] use metrics::Label;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
#[cfg(feature = "metrics")] use smallvec::SmallVec;
// self
use crate::_prelude::*;

#[cfg(feature = "metrics")]
type LabelSet = SmallVec<[Label; 2]>;

#[cfg(feature = "metrics")]
const METRIC_KEY_LOOKUPS_TOTAL: &str = "firebase_auth_key_lookups_total";
#[cfg(feature = "metrics")]
const METRIC_KEY_FETCH_TOTAL: &str = "firebase_auth_key_fetch_total";
#[cfg(feature = "metrics")]
const METRIC_KEY_FETCH_DURATION: &str = "firebase_auth_key_fetch_duration_seconds";
#[cfg(feature = "metrics")]
const METRIC_CUSTOM_TOKENS_TOTAL: &str = "firebase_auth_custom_tokens_total";
#[cfg(feature = "metrics")]
const METRIC_VERIFICATIONS_TOTAL: &str = "firebase_auth_id_token_verifications_total";

/// Shared Prometheus handle installed by [`install_default_exporter`].
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Thread-safe counters for a single key cache.
#[derive(Debug, Default)]
pub struct KeyCacheMetrics {
	lookups: AtomicU64,
	hits: AtomicU64,
	fetch_successes: AtomicU64,
	fetch_errors: AtomicU64,
	last_fetch_micros: AtomicU64,
}
impl KeyCacheMetrics {
	/// Create a new metrics accumulator.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record a lookup served from the cache.
	pub fn record_hit(&self) {
		self.lookups.fetch_add(1, Ordering::Relaxed);
		self.hits.fetch_add(1, Ordering::Relaxed);

		record_key_lookup(true);
	}

	/// Record a lookup that had to go to the network.
	pub fn record_miss(&self) {
		self.lookups.fetch_add(1, Ordering::Relaxed);

		record_key_lookup(false);
	}

	/// Record a successful fetch and its latency.
	pub fn record_fetch_success(&self, duration: Duration) {
		self.fetch_successes.fetch_add(1, Ordering::Relaxed);
		self.last_fetch_micros.store(duration.as_micros() as u64, Ordering::Relaxed);

		record_key_fetch("success", Some(duration));
	}

	/// Record a failed fetch.
	pub fn record_fetch_error(&self) {
		self.fetch_errors.fetch_add(1, Ordering::Relaxed);

		record_key_fetch("error", None);
	}

	/// Take a point-in-time snapshot.
	pub fn snapshot(&self) -> KeyCacheMetricsSnapshot {
		KeyCacheMetricsSnapshot {
			lookups: self.lookups.load(Ordering::Relaxed),
			hits: self.hits.load(Ordering::Relaxed),
			fetch_successes: self.fetch_successes.load(Ordering::Relaxed),
			fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
			last_fetch_micros: match self.last_fetch_micros.load(Ordering::Relaxed) {
				0 => None,
				value => Some(value),
			},
		}
	}
}

/// Read-only snapshot of key cache counters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCacheMetricsSnapshot {
	/// Total number of key lookups.
	pub lookups: u64,
	/// Lookups served without a network call.
	pub hits: u64,
	/// Successful certificate fetches.
	pub fetch_successes: u64,
	/// Failed certificate fetches.
	pub fetch_errors: u64,
	/// Microsecond latency of the most recent successful fetch.
	pub last_fetch_micros: Option<u64>,
}
impl KeyCacheMetricsSnapshot {
	/// Number of certificate fetches attempted.
	pub fn fetches(&self) -> u64 {
		self.fetch_successes + self.fetch_errors
	}

	/// Ratio of cache hits to total lookups.
	pub fn hit_rate(&self) -> f64 {
		if self.lookups == 0 { 0.0 } else { self.hits as f64 / self.lookups as f64 }
	}
}

/// Install the default Prometheus recorder backed by `metrics`.
///
/// Multiple invocations are safe; subsequent calls become no-ops once the recorder is installed.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new()
		.install_recorder()
		.map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Access the global Prometheus exporter handle when installed.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Record a custom token being minted.
pub fn record_custom_token_issued() {
	#[cfg(feature = "metrics")]
	metrics::counter!(METRIC_CUSTOM_TOKENS_TOTAL).increment(1);
}

/// Record the outcome of an ID token verification (`"success"` or an [`Error::kind`]).
pub fn record_verification(outcome: &'static str) {
	#[cfg(feature = "metrics")]
	metrics::counter!(METRIC_VERIFICATIONS_TOTAL, labels("outcome", outcome).iter()).increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = outcome;
}

fn record_key_lookup(hit: bool) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		METRIC_KEY_LOOKUPS_TOTAL,
		labels("result", if hit { "hit" } else { "miss" }).iter()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = hit;
}

fn record_key_fetch(status: &'static str, duration: Option<Duration>) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(METRIC_KEY_FETCH_TOTAL, labels("status", status).iter()).increment(1);

		if let Some(duration) = duration {
			metrics::histogram!(METRIC_KEY_FETCH_DURATION).record(duration.as_secs_f64());
		}
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (status, duration);
}

#[cfg(feature = "metrics")]
fn labels(key: &'static str, value: &'static str) -> LabelSet {
	let mut labels = LabelSet::new();

	labels.push(Label::new(key, value));

	labels
}

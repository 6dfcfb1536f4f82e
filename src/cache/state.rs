//! Cached public-key set and its freshness bookkeeping.

// std
use std::collections::HashMap;
// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::_prelude::*;

/// Public keys published by the trust anchor, keyed by `kid`.
///
/// Values are PEM encoded (X.509 certificates or SubjectPublicKeyInfo).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKeySet {
	keys: HashMap<String, String>,
}
impl PublicKeySet {
	/// PEM material for the given key id.
	pub fn get(&self, kid: &str) -> Option<&str> {
		self.keys.get(kid).map(String::as_str)
	}

	/// Whether the set knows the given key id.
	pub fn contains(&self, kid: &str) -> bool {
		self.keys.contains_key(kid)
	}

	/// Iterate over the known key ids.
	pub fn key_ids(&self) -> impl Iterator<Item = &str> {
		self.keys.keys().map(String::as_str)
	}

	/// Number of keys in the set.
	pub fn len(&self) -> usize {
		self.keys.len()
	}

	/// Whether the set is empty.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}
}
impl<K, V> FromIterator<(K, V)> for PublicKeySet
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self { keys: iter.into_iter().map(|(kid, pem)| (kid.into(), pem.into())).collect() }
	}
}

/// Metadata captured for a cached key set.
#[derive(Clone, Debug)]
pub struct KeySetPayload {
	/// Key set returned by the most recent successful fetch.
	pub keys: Arc<PublicKeySet>,
	/// UTC timestamp of the fetch.
	pub fetched_at: DateTime<Utc>,
	/// Monotonic deadline derived from `max-age`; `None` means the payload is never reused.
	pub expires_at: Option<Instant>,
}
impl KeySetPayload {
	/// Whether the payload may be served without contacting the endpoint.
	pub fn is_fresh(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|deadline| now < deadline)
	}
}

/// Cache lifecycle states.
#[derive(Clone, Debug, Default)]
pub enum CacheState {
	/// Nothing has been fetched yet, or the cache was invalidated.
	#[default]
	Empty,
	/// A key set is held; it may or may not still be fresh.
	Ready(KeySetPayload),
}
impl CacheState {
	/// Retrieve the current payload if available.
	pub fn payload(&self) -> Option<&KeySetPayload> {
		match self {
			CacheState::Ready(payload) => Some(payload),
			CacheState::Empty => None,
		}
	}

	/// Keys that can be served at `now` without a network round trip.
	pub fn fresh_keys(&self, now: Instant) -> Option<Arc<PublicKeySet>> {
		self.payload().filter(|payload| payload.is_fresh(now)).map(|payload| payload.keys.clone())
	}
}

//! `Cache-Control` handling for the certificate endpoint.

// crates.io
use http::{HeaderMap, header::CACHE_CONTROL};
// self
use crate::_prelude::*;

/// Extract the `max-age` directive from every `Cache-Control` header value.
///
/// Directives are comma separated; the last well-formed `max-age=<seconds>` wins. Values that do
/// not parse as whole seconds are ignored.
pub fn max_age(headers: &HeaderMap) -> Option<Duration> {
	let mut max_age = None;

	for value in headers.get_all(CACHE_CONTROL) {
		let Ok(raw) = value.to_str() else {
			continue;
		};

		for directive in raw.split(',') {
			let Some((name, seconds)) = directive.trim().split_once('=') else {
				continue;
			};

			if !name.trim().eq_ignore_ascii_case("max-age") {
				continue;
			}

			match seconds.trim().trim_matches('"').parse::<u64>() {
				Ok(seconds) => max_age = Some(Duration::from_secs(seconds)),
				Err(err) => tracing::debug!(directive, error = %err, "ignoring malformed max-age"),
			}
		}
	}

	max_age
}

/// Upper bound applied to an advertised `max-age`.
pub const MAX_AGE_CAP: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Monotonic expiry for a payload fetched at `now` with the given `max-age`.
///
/// Lifetimes beyond [`MAX_AGE_CAP`] are clamped to it.
pub fn expires_at(now: Instant, max_age: Option<Duration>) -> Option<Instant> {
	max_age.map(|ttl| now.checked_add(ttl.min(MAX_AGE_CAP)).unwrap_or(now))
}

/// First `Cache-Control` value, for logging.
pub fn cache_control_header(headers: &HeaderMap) -> Option<&str> {
	headers.get(CACHE_CONTROL)?.to_str().ok()
}

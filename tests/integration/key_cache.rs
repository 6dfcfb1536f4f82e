//! Certificate caching against a mocked Google endpoint.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use firebase_auth_token::{Error, KeyCache, Result};
use serde_json::json;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};
// self
use crate::support::{
	CERTS_PATH, OTHER_PUBLIC_KEY, PUBLIC_KEY, certificate_response, mount_certificates, verifier,
};

#[tokio::test]
async fn reuses_keys_within_max_age() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	mount_certificates(&server, &[("k1", PUBLIC_KEY)], Some(60), 1).await;

	let cache = KeyCache::new(verifier(&server))?;
	let first = cache.fetch().await?;
	let second = cache.fetch().await?;

	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(first.get("k1"), Some(PUBLIC_KEY));

	let metrics = cache.metrics().snapshot();

	assert_eq!(metrics.lookups, 2);
	assert_eq!(metrics.hits, 1);
	assert_eq!(metrics.fetch_successes, 1);

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn refetches_after_expiry_and_replaces_every_key() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(CERTS_PATH))
		.respond_with(certificate_response(&[("old", PUBLIC_KEY)], Some(1)))
		.up_to_n_times(1)
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path(CERTS_PATH))
		.respond_with(certificate_response(&[("new", OTHER_PUBLIC_KEY)], Some(60)))
		.expect(1)
		.mount(&server)
		.await;

	let cache = KeyCache::new(verifier(&server))?;
	let first = cache.fetch().await?;

	assert!(first.contains("old"));

	tokio::time::sleep(Duration::from_millis(1_100)).await;

	let second = cache.fetch().await?;

	assert!(second.contains("new"));
	assert!(!second.contains("old"));
	assert_eq!(second.len(), 1);

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn missing_max_age_means_every_read_fetches() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	mount_certificates(&server, &[("k1", PUBLIC_KEY)], None, 2).await;

	let cache = KeyCache::new(verifier(&server))?;

	cache.fetch().await?;
	cache.fetch().await?;

	assert!(cache.snapshot().await.payload().is_some_and(|payload| payload.expires_at.is_none()));

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn invalidate_forces_a_new_fetch() -> Result<()> {
	let server = MockServer::start().await;

	mount_certificates(&server, &[("k1", PUBLIC_KEY)], Some(3600), 2).await;

	let cache = KeyCache::new(verifier(&server))?;

	cache.fetch().await?;
	cache.invalidate().await;

	assert!(cache.snapshot().await.payload().is_none());

	cache.fetch().await?;

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn concurrent_misses_share_one_fetch() -> Result<()> {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(CERTS_PATH))
		.respond_with(
			certificate_response(&[("k1", PUBLIC_KEY)], Some(60))
				.set_delay(Duration::from_millis(200)),
		)
		.expect(1)
		.mount(&server)
		.await;

	let cache = KeyCache::new(verifier(&server))?;
	let (first, second) = tokio::join!(cache.fetch(), cache.fetch());

	assert!(Arc::ptr_eq(&first?, &second?));

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn error_bodies_and_statuses_are_key_fetch_errors() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(CERTS_PATH))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"error": "backend_error",
			"error_description": "certificates unavailable"
		})))
		.up_to_n_times(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path(CERTS_PATH))
		.respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
		.mount(&server)
		.await;

	let cache = KeyCache::new(verifier(&server)).expect("cache");
	let described = cache.fetch().await.expect_err("error body");

	assert!(matches!(
		described,
		Error::KeyFetch(ref message) if message == "backend_error (certificates unavailable)"
	));
	assert_eq!(
		described.to_string(),
		"Error fetching public keys for Google certs: backend_error (certificates unavailable)"
	);
	assert!(matches!(cache.fetch().await, Err(Error::KeyFetch(_))));
	assert_eq!(cache.metrics().snapshot().fetch_errors, 2);
}

#[tokio::test]
async fn https_is_enforced_by_default() {
	let server = MockServer::start().await;
	let config = verifier(&server).with_require_https(true);

	assert!(matches!(KeyCache::new(config), Err(Error::Validation { field: "cert_url", .. })));
}

//! Request-scoped entry point: one request id in, one signed custom token out.

// self
use crate::{_prelude::*, auth::Auth};

/// Mint a custom token whose uid is the caller-supplied request id.
///
/// Failures from the underlying [`Auth::create_custom_token`] propagate unchanged.
pub fn issue_for_request(auth: &Auth, request_id: &str) -> Result<String> {
	let token = auth.create_custom_token(request_id)?;

	tracing::info!(request_id, "issued custom token for request");

	Ok(token)
}

//! Structural JWT decoding without signature verification.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Header and payload of a compact JWS, not yet verified.
#[derive(Clone, Debug, PartialEq)]
pub struct UnverifiedToken {
	/// Decoded JOSE header.
	pub header: Map<String, Value>,
	/// Decoded claims.
	pub payload: Map<String, Value>,
}
impl UnverifiedToken {
	/// `kid` header, if present and a string.
	pub fn key_id(&self) -> Option<&str> {
		self.header.get("kid").and_then(Value::as_str)
	}

	/// `alg` header, if present and a string.
	pub fn algorithm(&self) -> Option<&str> {
		self.header.get("alg").and_then(Value::as_str)
	}

	/// String claim from the payload.
	pub fn claim_str(&self, claim: &str) -> Option<&str> {
		self.payload.get(claim).and_then(Value::as_str)
	}
}

/// Split a compact JWS and decode its header and payload.
pub fn decode_unverified(token: &str) -> Result<UnverifiedToken> {
	let mut segments = token.split('.');
	let (Some(header), Some(payload), Some(_signature), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return Err(Error::Decode("token must have three dot-separated segments".into()));
	};

	Ok(UnverifiedToken {
		header: decode_segment(header, "header")?,
		payload: decode_segment(payload, "payload")?,
	})
}

fn decode_segment(segment: &str, name: &str) -> Result<Map<String, Value>> {
	let bytes = URL_SAFE_NO_PAD
		.decode(segment.trim_end_matches('='))
		.map_err(|err| Error::Decode(format!("{name} is not valid base64url: {err}")))?;

	match serde_json::from_slice::<Value>(&bytes) {
		Ok(Value::Object(fields)) => Ok(fields),
		Ok(_) => Err(Error::Decode(format!("{name} is not a JSON object"))),
		Err(err) => Err(Error::Decode(format!("{name} is not valid JSON: {err}"))),
	}
}

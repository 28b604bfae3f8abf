//! Opaque continuation tokens for keyset pagination.
//!
//! A token is the URL-safe base64 encoding of the JSON pair `[sort_value, tie_breaker]`.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Serialize, Serializer};
use serde_json::Value;

// Bound on untrusted token input.
const MAX_CURSOR_TOKEN_LEN: usize = 4 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorDecodeError {
	#[error("cursor token is empty")]
	Empty,
	#[error("cursor token exceeds max length: {len} chars (max {max})")]
	TooLong { len: usize, max: usize },
	#[error("cursor token is not valid base64: {0}")]
	Base64(String),
	#[error("cursor token is not valid JSON: {0}")]
	Json(String),
	#[error("cursor token must be a [sort_value, tie_breaker] pair")]
	Shape,
}

/// Position of one record in a keyset ordering.
///
/// `sort_value` is `None` only for records in the null tail of the primary sort field.
#[derive(Clone, Debug, PartialEq)]
pub struct Cursor {
	pub sort_value: Option<Value>,
	pub tie_breaker: Value,
}
impl Cursor {
	pub fn new(sort_value: Option<Value>, tie_breaker: Value) -> Self {
		Self { sort_value, tie_breaker }
	}

	/// Builds a cursor from a hit's `sort` array.
	///
	/// The cluster reports a missing primary value as the `i64::MAX` or `i64::MIN` sentinel; both
	/// map back to `None`. A single-element array means the primary sort is the tie-breaker.
	pub fn from_sort_values(values: &[Value]) -> Option<Self> {
		match values {
			[tie] => Some(Self::new(Some(tie.clone()), tie.clone())),
			[sort, tie, ..] => Some(Self::new(null_sentinel_to_none(sort), tie.clone())),
			[] => None,
		}
	}

	pub fn encode(&self) -> String {
		let pair = Value::Array(vec![
			self.sort_value.clone().unwrap_or(Value::Null),
			self.tie_breaker.clone(),
		]);

		URL_SAFE_NO_PAD.encode(pair.to_string())
	}

	pub fn decode(token: &str) -> Result<Self, CursorDecodeError> {
		let token = token.trim();

		if token.is_empty() {
			return Err(CursorDecodeError::Empty);
		}
		if token.len() > MAX_CURSOR_TOKEN_LEN {
			return Err(CursorDecodeError::TooLong { len: token.len(), max: MAX_CURSOR_TOKEN_LEN });
		}

		let bytes = URL_SAFE_NO_PAD
			.decode(token)
			.map_err(|err| CursorDecodeError::Base64(err.to_string()))?;
		let value: Value = serde_json::from_slice(&bytes)
			.map_err(|err| CursorDecodeError::Json(err.to_string()))?;
		let Value::Array(mut pair) = value else {
			return Err(CursorDecodeError::Shape);
		};

		if pair.len() != 2 {
			return Err(CursorDecodeError::Shape);
		}

		let tie_breaker = pair.pop().unwrap_or(Value::Null);
		let sort_value = pair.pop().unwrap_or(Value::Null);

		if tie_breaker.is_null() {
			return Err(CursorDecodeError::Shape);
		}

		let sort_value = if sort_value.is_null() { None } else { Some(sort_value) };

		Ok(Self { sort_value, tie_breaker })
	}
}

impl Serialize for Cursor {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.encode())
	}
}

fn null_sentinel_to_none(value: &Value) -> Option<Value> {
	match value.as_i64() {
		Some(i64::MAX) | Some(i64::MIN) => None,
		_ if value.is_null() => None,
		_ => Some(value.clone()),
	}
}

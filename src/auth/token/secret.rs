//! Secret string wrapper: redacted formatting, constant-time comparison.

// self
use crate::_prelude::*;

/// Holds tokens, PKCE verifiers, and client secrets; never prints its contents.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Compares against `candidate` without short-circuiting on the first differing byte.
	pub fn matches(&self, candidate: &str) -> bool {
		constant_time_eq(self.0.as_bytes(), candidate.as_bytes())
	}
}
impl PartialEq for TokenSecret {
	fn eq(&self, other: &Self) -> bool {
		self.matches(&other.0)
	}
}
impl Eq for TokenSecret {}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenSecret(<redacted>)")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Byte comparison whose running time depends only on the lengths.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	if a.len() != b.len() {
		return false;
	}

	a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

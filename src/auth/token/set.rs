//! Complete token set persisted after a successful exchange or refresh.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Validated ID-token claims as returned to the browser by `/userinfo`.
pub type IdTokenClaims = serde_json::Map<String, serde_json::Value>;

/// Tokens held server-side for one authenticated session.
///
/// The set only exists as a whole: flows build it from a validated token response and replace
/// or drop it atomically, so a session never carries a partial token set.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
	/// Raw ID token, replayed as `id_token_hint` on logout.
	pub id_token: TokenSecret,
	/// Claims decoded from the validated ID token.
	pub id_token_claims: IdTokenClaims,
	/// Access token attached to upstream API calls, if the provider issued one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<TokenSecret>,
	/// Refresh token, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Absolute expiry instant, stored as epoch seconds.
	#[serde(with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
}
impl TokenSet {
	/// Returns `true` while `instant` is strictly before the expiry.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}

	/// Returns the `sub` claim of the ID token.
	pub fn subject(&self) -> Option<&str> {
		self.id_token_claims.get("sub").and_then(serde_json::Value::as_str)
	}
}
impl Debug for TokenSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSet")
			.field("id_token", &self.id_token)
			.field("subject", &self.subject())
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn token_set() -> TokenSet {
		let mut claims = IdTokenClaims::new();

		claims.insert("sub".into(), "user-1".into());

		TokenSet {
			id_token: TokenSecret::new("id.token.value"),
			id_token_claims: claims,
			access_token: Some(TokenSecret::new("access-value")),
			refresh_token: Some(TokenSecret::new("refresh-value")),
			expires_at: datetime!(2030-01-01 00:00 UTC),
		}
	}

	#[test]
	fn validity_is_strict_at_the_expiry_boundary() {
		let set = token_set();

		assert!(set.is_valid_at(datetime!(2029-12-31 23:59:59 UTC)));
		assert!(!set.is_valid_at(datetime!(2030-01-01 00:00 UTC)));
	}

	#[test]
	fn debug_output_hides_every_secret() {
		let rendered = format!("{:?}", token_set());

		assert!(rendered.contains("user-1"));
		assert!(!rendered.contains("access-value"));
		assert!(!rendered.contains("refresh-value"));
		assert!(!rendered.contains("id.token.value"));
	}

	#[test]
	fn expiry_is_stored_as_epoch_seconds() {
		let json = serde_json::to_value(token_set()).expect("Token set should serialize.");

		assert_eq!(json["expires_at"], serde_json::json!(1_893_456_000));
	}
}

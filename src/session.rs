//! Server-side session record addressed by the browser cookie.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, TokenSet},
};

/// One in-flight login attempt created by `start`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAttempt {
	/// CSRF value the callback must echo exactly.
	pub state: String,
	/// Value the ID token must carry in its `nonce` claim.
	pub nonce: String,
	/// PKCE verifier sent with the code exchange.
	pub pkce_verifier: TokenSecret,
}
impl Debug for PendingAttempt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PendingAttempt")
			.field("state", &self.state)
			.field("nonce", &"<redacted>")
			.field("pkce_verifier", &self.pkce_verifier)
			.finish()
	}
}

/// Everything the BFF keeps for one browser session.
///
/// A record holds at most one pending attempt and at most one complete [`TokenSet`]; the two
/// are independent, so a logged-in user can start a new login without losing their tokens.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
	/// Login attempt awaiting its callback.
	#[serde(default)]
	pub pending: Option<PendingAttempt>,
	/// Tokens from the last successful exchange or refresh.
	#[serde(default)]
	pub tokens: Option<TokenSet>,
}
impl SessionRecord {
	/// Returns `true` when a token set is stored, regardless of its expiry.
	pub fn has_tokens(&self) -> bool {
		self.tokens.is_some()
	}

	/// Returns the token set only while it is unexpired at `now`.
	pub fn tokens_valid_at(&self, now: OffsetDateTime) -> Option<&TokenSet> {
		self.tokens.as_ref().filter(|tokens| tokens.is_valid_at(now))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::auth::IdTokenClaims;

	#[test]
	fn expired_tokens_are_hidden_but_still_present() {
		let record = SessionRecord {
			pending: None,
			tokens: Some(TokenSet {
				id_token: TokenSecret::new("id"),
				id_token_claims: IdTokenClaims::new(),
				access_token: Some(TokenSecret::new("access")),
				refresh_token: None,
				expires_at: datetime!(2030-01-01 00:00 UTC),
			}),
		};

		assert!(record.tokens_valid_at(datetime!(2029-12-31 00:00 UTC)).is_some());
		assert!(record.tokens_valid_at(datetime!(2030-01-01 00:00 UTC)).is_none());
		assert!(record.has_tokens());
	}

	#[test]
	fn pending_attempt_debug_hides_verifier_and_nonce() {
		let attempt = PendingAttempt {
			state: "state-1".into(),
			nonce: "nonce-secret".into(),
			pkce_verifier: TokenSecret::new("verifier-secret"),
		};
		let rendered = format!("{attempt:?}");

		assert!(rendered.contains("state-1"));
		assert!(!rendered.contains("nonce-secret"));
		assert!(!rendered.contains("verifier-secret"));
	}

	#[test]
	fn empty_record_deserializes_from_empty_object() {
		let record: SessionRecord =
			serde_json::from_str("{}").expect("Empty record should deserialize.");

		assert_eq!(record, SessionRecord::default());
	}
}

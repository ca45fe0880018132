//! Refresh token redemption.
//!
//! A refresh only touches the provider when the session holds a refresh token. The refreshed
//! set keeps the previous refresh token and ID token when the provider omits new ones; a new ID
//! token is verified (without a nonce) and must name the same subject. Any upstream failure
//! destroys the session.

// self
use crate::{
	_prelude::*,
	auth::{IdTokenError, SessionId, TokenSecret, TokenSet},
	error::TokenEndpointError,
	flows::{Bff, common},
	http::TokenHttpClient,
	oauth::{GrantType, TokenExchange, TransportErrorMapper},
	obs::{self, FlowKind},
};

/// Response body of `refresh`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
	/// New expiry as epoch seconds; present only on success.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<i64>,
	/// Whether the session holds a token set after the call.
	pub logged_in: bool,
	/// Whether a refresh happened.
	pub refresh_ok: bool,
}
impl RefreshOutcome {
	/// Outcome for sessions that cannot be (or failed to be) refreshed.
	pub const fn failed() -> Self {
		Self { expires_at: None, logged_in: false, refresh_ok: false }
	}
}

impl<C, M> Bff<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Redeems the session's refresh token for a new token set.
	pub async fn refresh(&self, session: Option<&SessionId>) -> Result<RefreshOutcome> {
		common::observe(FlowKind::Refresh, "refresh", async move {
			let Some(id) = session else {
				return Ok(RefreshOutcome::failed());
			};
			let _lock = common::session_guard(self, id).await;
			let Some(mut record) = self.store.load(id).await? else {
				return Ok(RefreshOutcome::failed());
			};
			let Some(current) = record.tokens.as_ref() else {
				return Ok(RefreshOutcome::failed());
			};
			let Some(refresh_token) = current.refresh_token.clone() else {
				tracing::debug!(session = %id, "No refresh token stored; skipping provider call.");

				return Ok(RefreshOutcome::failed());
			};

			match self.redeem(current, &refresh_token).await {
				Ok(tokens) => {
					let expires_at = tokens.expires_at.unix_timestamp();

					record.tokens = Some(tokens);

					self.store.save(id, record).await?;

					tracing::info!(session = %id, expires_at, "Tokens refreshed.");

					Ok(RefreshOutcome { expires_at: Some(expires_at), logged_in: true, refresh_ok: true })
				},
				Err(e) if e.is_upstream() => {
					tracing::warn!(session = %id, error = %e, "Refresh failed; session dropped.");

					self.store.destroy(id).await?;
					obs::record_session_dropped(FlowKind::Refresh);

					Ok(RefreshOutcome::failed())
				},
				Err(e) => Err(e),
			}
		})
		.await
	}

	async fn redeem(&self, current: &TokenSet, refresh_token: &TokenSecret) -> Result<TokenSet> {
		const GRANT: GrantType = GrantType::RefreshToken;

		let exchanged = self.exchange.refresh_token(refresh_token.expose()).await?;
		let (id_token, id_token_claims, fresh_claims) = match exchanged.id_token {
			Some(raw) => {
				let claims = self.verifier.verify(raw.expose(), None).await?;

				if claims.get("sub").and_then(serde_json::Value::as_str) != current.subject() {
					return Err(IdTokenError::SubjectChanged.into());
				}

				(raw, claims.clone(), Some(claims))
			},
			None => (current.id_token.clone(), current.id_token_claims.clone(), None),
		};
		let expires_at = common::resolve_expiry(
			OffsetDateTime::now_utc(),
			exchanged.expires_in,
			fresh_claims.as_ref(),
		)
		.ok_or(TokenEndpointError::MissingExpiry { grant: GRANT })?;

		Ok(TokenSet {
			id_token,
			id_token_claims,
			access_token: exchanged.access_token,
			refresh_token: exchanged.refresh_token.or_else(|| current.refresh_token.clone()),
			expires_at,
		})
	}
}

//! Read-only views of the session: cached claims and the upstream bearer token.

// self
use crate::{
	_prelude::*,
	auth::{IdTokenClaims, SessionId, TokenSecret},
	flows::{Bff, common},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::FlowKind,
	session::SessionRecord,
};

impl<C, M> Bff<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns the cached ID-token claims, or an empty object once the tokens expired.
	pub async fn userinfo(&self, session: Option<&SessionId>) -> Result<IdTokenClaims> {
		self.userinfo_at(session, OffsetDateTime::now_utc()).await
	}

	/// [`Bff::userinfo`] evaluated at an explicit instant.
	pub async fn userinfo_at(
		&self,
		session: Option<&SessionId>,
		now: OffsetDateTime,
	) -> Result<IdTokenClaims> {
		common::observe(FlowKind::Userinfo, "userinfo", async move {
			Ok(self
				.live_record(session)
				.await?
				.and_then(|record| record.tokens_valid_at(now).map(|t| t.id_token_claims.clone()))
				.unwrap_or_default())
		})
		.await
	}

	/// Access token a reverse proxy may forward upstream, present only while the tokens are
	/// unexpired. The proxy must refuse to forward when this yields `None`.
	pub async fn upstream_bearer(&self, session: Option<&SessionId>) -> Result<Option<TokenSecret>> {
		let now = OffsetDateTime::now_utc();

		Ok(self.live_record(session).await?.and_then(|record| {
			record.tokens_valid_at(now).and_then(|tokens| tokens.access_token.clone())
		}))
	}

	async fn live_record(&self, session: Option<&SessionId>) -> Result<Option<SessionRecord>> {
		match session {
			Some(id) => Ok(self.store.load(id).await?),
			None => Ok(None),
		}
	}
}

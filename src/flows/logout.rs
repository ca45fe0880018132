//! Session teardown and RP-initiated logout.

// self
use crate::{
	_prelude::*,
	auth::{SessionId, TokenSecret},
	flows::{Bff, common},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::FlowKind,
};

/// Response body of `logout`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutOutcome {
	/// Provider end-session URL the browser should visit, when one applies.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub logout_url: Option<Url>,
}

impl<C, M> Bff<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Destroys the session; returns the end-session URL when the provider supports one and the
	/// session held an ID token.
	pub async fn logout(&self, session: Option<&SessionId>) -> Result<LogoutOutcome> {
		common::observe(FlowKind::Logout, "logout", async move {
			let Some(id) = session else {
				return Ok(LogoutOutcome::default());
			};
			let _lock = common::session_guard(self, id).await;
			let record = self.store.load(id).await?;

			self.store.destroy(id).await?;

			let logout_url = record
				.and_then(|record| record.tokens)
				.and_then(|tokens| self.end_session_url(&tokens.id_token));

			tracing::info!(session = %id, provider_logout = logout_url.is_some(), "Session ended.");

			Ok(LogoutOutcome { logout_url })
		})
		.await
	}

	fn end_session_url(&self, id_token: &TokenSecret) -> Option<Url> {
		let mut url = self.descriptor.endpoints.end_session.clone()?;

		url.query_pairs_mut()
			.append_pair("id_token_hint", id_token.expose())
			.append_pair("post_logout_redirect_uri", self.client.post_logout_redirect_uri.as_str());

		Some(url)
	}
}

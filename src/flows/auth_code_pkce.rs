//! Authorization Code + PKCE: `start` and `pageload`.
//!
//! `start` persists a [`PendingAttempt`] and hands back the authorization URL. `pageload`
//! accepts the full URL the browser landed on after the provider redirect; it only calls the
//! token endpoint when the URL carries a `code` and a `state` that exactly matches the pending
//! attempt. The attempt is removed from the stored record before the exchange, so a replayed
//! or double-submitted callback finds nothing to consume.

pub mod authorize;
pub mod pkce;

pub use pkce::*;

// self
use crate::{
	_prelude::*,
	auth::{SessionId, TokenSet, token::secret::constant_time_eq},
	error::TokenEndpointError,
	flows::{
		Bff,
		auth_code_pkce::authorize::{CallbackParams, build_authorize_url},
		common,
	},
	http::TokenHttpClient,
	oauth::{GrantType, TokenExchange, TransportErrorMapper},
	obs::{self, FlowKind},
	session::{PendingAttempt, SessionRecord},
};

/// Response body of `start`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
	/// Provider URL the browser must navigate to.
	pub auth_redir_url: Url,
}

/// Response body of `pageload`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLoadOutcome {
	/// Whether the session holds a token set after the call.
	pub logged_in: bool,
	/// Whether this call completed a login callback.
	pub handled_auth: bool,
}
impl PageLoadOutcome {
	fn unhandled(logged_in: bool) -> Self {
		Self { logged_in, handled_auth: false }
	}
}

impl<C, M> Bff<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Starts a login attempt and returns the session id to set in the cookie.
	///
	/// A known session keeps its tokens and only has its pending attempt replaced. An unknown or
	/// absent id gets a freshly minted one; client-chosen ids are never adopted.
	pub async fn start(&self, session: Option<&SessionId>) -> Result<(SessionId, StartOutcome)> {
		common::observe(FlowKind::Start, "start", async move {
			let existing = match session {
				Some(id) => {
					let lock = common::session_guard(self, id).await;

					self.store.load(id).await?.map(|record| (id.clone(), record, lock))
				},
				None => None,
			};
			let (id, mut record, _lock) = match existing {
				Some(found) => found,
				None => {
					let id = SessionId::generate();
					let lock = common::session_guard(self, &id).await;

					(id, SessionRecord::default(), lock)
				},
			};
			let secrets = AttemptSecrets::generate();
			let auth_redir_url = build_authorize_url(&self.descriptor, &self.client, &secrets);

			record.pending = Some(PendingAttempt {
				state: secrets.state,
				nonce: secrets.nonce,
				pkce_verifier: secrets.pkce.verifier,
			});

			self.store.save(&id, record).await?;

			tracing::info!(session = %id, "Login attempt started.");

			Ok((id, StartOutcome { auth_redir_url }))
		})
		.await
	}

	/// Handles the page URL the browser loaded, completing the login when it is our callback.
	pub async fn pageload(
		&self,
		session: Option<&SessionId>,
		page_url: &str,
	) -> Result<PageLoadOutcome> {
		common::observe(FlowKind::PageLoad, "pageload", async move {
			let Some(id) = session else {
				return Ok(PageLoadOutcome::unhandled(false));
			};
			let _lock = common::session_guard(self, id).await;
			let Some(mut record) = self.store.load(id).await? else {
				return Ok(PageLoadOutcome::unhandled(false));
			};
			let CallbackParams { code, state } = CallbackParams::from_page_url(page_url);
			let Some(code) = code else {
				return Ok(PageLoadOutcome::unhandled(record.has_tokens()));
			};
			let state_matches = match (state.as_deref(), record.pending.as_ref()) {
				(Some(returned), Some(pending)) =>
					constant_time_eq(returned.as_bytes(), pending.state.as_bytes()),
				_ => false,
			};

			if !state_matches {
				tracing::warn!(
					session = %id,
					pending = record.pending.is_some(),
					"Callback state does not match a pending attempt."
				);

				return Ok(PageLoadOutcome::unhandled(record.has_tokens()));
			}

			let Some(attempt) = record.pending.take() else {
				return Ok(PageLoadOutcome::unhandled(record.has_tokens()));
			};

			// Persist the consumed attempt before any provider call.
			self.store.save(id, record.clone()).await?;

			match self.complete_exchange(&code, &attempt).await {
				Ok(tokens) => {
					tracing::info!(session = %id, subject = tokens.subject(), "Login completed.");

					record.tokens = Some(tokens);

					self.store.save(id, record).await?;

					Ok(PageLoadOutcome { logged_in: true, handled_auth: true })
				},
				Err(e) if e.is_upstream() => {
					tracing::warn!(session = %id, error = %e, "Code exchange failed; session dropped.");

					self.store.destroy(id).await?;
					obs::record_session_dropped(FlowKind::PageLoad);

					Ok(PageLoadOutcome::unhandled(false))
				},
				Err(e) => Err(e),
			}
		})
		.await
	}

	async fn complete_exchange(&self, code: &str, attempt: &PendingAttempt) -> Result<TokenSet> {
		const GRANT: GrantType = GrantType::AuthorizationCode;

		let exchanged = self
			.exchange
			.exchange_code(code, &self.client.redirect_uri, attempt.pkce_verifier.expose())
			.await?;
		let id_token =
			exchanged.id_token.ok_or(TokenEndpointError::MissingIdToken { grant: GRANT })?;
		let claims = self.verifier.verify(id_token.expose(), Some(attempt.nonce.as_str())).await?;
		let expires_at =
			common::resolve_expiry(OffsetDateTime::now_utc(), exchanged.expires_in, Some(&claims))
				.ok_or(TokenEndpointError::MissingExpiry { grant: GRANT })?;

		Ok(TokenSet {
			id_token,
			id_token_claims: claims,
			access_token: exchanged.access_token,
			refresh_token: exchanged.refresh_token,
			expires_at,
		})
	}
}

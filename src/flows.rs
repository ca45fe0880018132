//! Authorization flow controller.
//!
//! [`Bff`] owns the immutable provider descriptor, the ID-token verifier, the token exchange
//! client, and the session store. Each operation loads the session record by id, drives the
//! login state machine, and writes the record back explicitly:
//!
//! - [`Bff::start`] mints a login attempt and returns the authorization URL.
//! - [`Bff::pageload`] consumes the provider callback and exchanges the code.
//! - [`Bff::userinfo`] returns cached ID-token claims while the tokens are unexpired.
//! - [`Bff::refresh`] redeems the refresh token.
//! - [`Bff::logout`] drops the session and builds the RP-initiated logout URL.

pub mod auth_code_pkce;
pub mod common;
pub mod logout;
pub mod refresh;
pub mod userinfo;

pub use auth_code_pkce::*;
pub use logout::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{IdTokenVerifier, SessionId},
	config::ClientRegistration,
	error::ConfigError,
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{ReqwestTransportErrorMapper, TokenExchangeClient, TransportErrorMapper},
	provider::ProviderDescriptor,
	store::SessionStore,
};

/// Controller specialized for the crate's default reqwest transport stack.
pub type ReqwestBff = Bff<ReqwestHttpClient, ReqwestTransportErrorMapper>;

type GuardMap = Arc<Mutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>>;

/// Runs the BFF login flows against a single provider.
pub struct Bff<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Provider metadata resolved at startup.
	pub descriptor: Arc<ProviderDescriptor>,
	/// Client registration used in every request to the provider.
	pub client: ClientRegistration,
	/// Session record storage.
	pub store: Arc<dyn SessionStore>,
	verifier: Arc<IdTokenVerifier>,
	exchange: TokenExchangeClient<C, M>,
	session_guards: GuardMap,
}
impl<C, M> Bff<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Assembles a controller from already resolved parts.
	pub fn with_http_client(
		descriptor: impl Into<Arc<ProviderDescriptor>>,
		client: ClientRegistration,
		verifier: impl Into<Arc<IdTokenVerifier>>,
		store: Arc<dyn SessionStore>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let descriptor = descriptor.into();
		let exchange = TokenExchangeClient::from_descriptor(
			&descriptor,
			&client.client_id,
			&client.client_secret,
			http_client,
			mapper,
		)?;

		Ok(Self {
			descriptor,
			client,
			store,
			verifier: verifier.into(),
			exchange,
			session_guards: Default::default(),
		})
	}
}
impl Bff<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Resolves provider metadata and signing keys, then builds the controller.
	///
	/// Any failure here is a [`ConfigError`]: the process must not serve traffic without a
	/// resolved descriptor.
	pub async fn discover(
		issuer: &Url,
		client: ClientRegistration,
		http: ReqwestClient,
		store: Arc<dyn SessionStore>,
	) -> Result<Self> {
		let descriptor =
			ProviderDescriptor::discover(&http, issuer).await.map_err(ConfigError::from)?;
		let verifier = IdTokenVerifier::load(
			&descriptor,
			client.client_id.clone(),
			client.client_secret.clone(),
			http.clone(),
		)
		.await
		.map_err(ConfigError::from)?;

		Self::with_http_client(
			descriptor,
			client,
			verifier,
			store,
			ReqwestHttpClient::with_client(http),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> Debug for Bff<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Bff")
			.field("issuer", &self.descriptor.issuer)
			.field("client_id", &self.client.client_id)
			.field("redirect_uri", &self.client.redirect_uri.as_str())
			.finish()
	}
}

//! Token exchange client built on the `oauth2` crate.
//!
//! [`TokenExchangeClient`] performs the two token endpoint grants the BFF needs
//! (`authorization_code` with a PKCE verifier, and `refresh_token`) as a confidential client and
//! maps every failure into the crate error taxonomy. Callers receive [`ExchangedTokens`] and
//! are responsible for ID-token verification.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AccessToken, AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret,
	EndpointNotSet, EndpointSet, HttpClientError, PkceCodeVerifier, RedirectUrl, RefreshToken,
	RequestTokenError, Scope, StandardRevocableToken, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
	helpers,
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TokenEndpointError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{ClientAuthMethod, ProviderDescriptor},
};

type ConfiguredClient = Client<
	BasicErrorResponse,
	OidcTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type ExchangeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Token endpoint grants issued by the BFF.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// `grant_type=authorization_code`.
	AuthorizationCode,
	/// `grant_type=refresh_token`.
	RefreshToken,
}
impl GrantType {
	/// Returns the registered `grant_type` value.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token endpoint response of an OpenID Connect provider.
///
/// Unlike the `oauth2` crate's standard response, only the HTTP status decides success here:
/// `access_token` and `token_type` may be absent. An absent access token is read as an empty
/// one and reported as `None` by [`OidcTokenResponse::issued_access_token`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OidcTokenResponse {
	#[serde(default = "absent_access_token")]
	access_token: AccessToken,
	#[serde(
		default = "bearer",
		deserialize_with = "helpers::deserialize_untagged_enum_case_insensitive"
	)]
	token_type: BasicTokenType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_in: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	refresh_token: Option<RefreshToken>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	id_token: Option<String>,
}
impl OidcTokenResponse {
	/// Access token, when the provider issued a non-empty one.
	pub fn issued_access_token(&self) -> Option<&AccessToken> {
		Some(&self.access_token).filter(|token| !token.secret().is_empty())
	}

	/// Raw ID token, when the provider issued one.
	pub fn id_token(&self) -> Option<&str> {
		self.id_token.as_deref()
	}
}
impl TokenResponse for OidcTokenResponse {
	type TokenType = BasicTokenType;

	fn access_token(&self) -> &AccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &Self::TokenType {
		&self.token_type
	}

	fn expires_in(&self) -> Option<std::time::Duration> {
		self.expires_in.map(std::time::Duration::from_secs)
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		self.refresh_token.as_ref()
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		None
	}
}

fn absent_access_token() -> AccessToken {
	AccessToken::new(String::new())
}

fn bearer() -> BasicTokenType {
	BasicTokenType::Bearer
}

/// Tokens returned by a successful grant, before ID-token verification.
#[derive(Clone, Debug)]
pub struct ExchangedTokens {
	/// Access token for upstream API calls, when issued.
	pub access_token: Option<TokenSecret>,
	/// Refresh token, when issued.
	pub refresh_token: Option<TokenSecret>,
	/// Raw ID token, when issued. Always present after a code exchange.
	pub id_token: Option<TokenSecret>,
	/// Validated positive `expires_in`, when the provider sent one.
	pub expires_in: Option<Duration>,
}

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		grant: GrantType,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_builder() => ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TokenEndpointError::UnexpectedResponse {
				grant,
				message,
				status: meta_status(meta),
			}
			.into(),
			_ => TokenEndpointError::UnexpectedResponse {
				grant,
				message: "HTTP client error".into(),
				status: meta_status(meta),
			}
			.into(),
		}
	}
}

/// Token endpoint operations used by the flow controller.
pub(crate) trait TokenExchange {
	/// Exchanges an authorization code plus PKCE verifier for tokens.
	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		redirect_uri: &'a Url,
		code_verifier: &'a str,
	) -> ExchangeFuture<'a, ExchangedTokens>;

	/// Redeems a refresh token for a new token set.
	fn refresh_token<'a>(&'a self, refresh_token: &'a str) -> ExchangeFuture<'a, ExchangedTokens>;
}

/// Confidential `oauth2` client bound to one provider descriptor.
pub struct TokenExchangeClient<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Configures the client from discovered metadata and the client registration.
	pub fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		client_secret: &TokenSecret,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let auth_url = AuthUrl::from_url(descriptor.endpoints.authorization.clone());
		let token_url = TokenUrl::from_url(descriptor.endpoints.token.clone());
		let auth_type = match descriptor.client_auth_method {
			ClientAuthMethod::ClientSecretBasic => AuthType::BasicAuth,
			ClientAuthMethod::ClientSecretPost => AuthType::RequestBody,
		};
		let oauth_client = Client::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_auth_type(auth_type);

		Ok(Self {
			oauth_client,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}
}
impl<C, M> TokenExchange for TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		redirect_uri: &'a Url,
		code_verifier: &'a str,
	) -> ExchangeFuture<'a, ExchangedTokens> {
		const GRANT: GrantType = GrantType::AuthorizationCode;

		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let response = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_pkce_verifier(PkceCodeVerifier::new(code_verifier.to_owned()))
				.set_redirect_uri(Cow::Owned(RedirectUrl::from_url(redirect_uri.clone())))
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(GRANT, meta.take(), err, self.error_mapper.as_ref()))?;
			let tokens = map_token_response(GRANT, response)?;

			if tokens.id_token.is_none() {
				return Err(TokenEndpointError::MissingIdToken { grant: GRANT }.into());
			}

			Ok(tokens)
		})
	}

	fn refresh_token<'a>(&'a self, refresh_token: &'a str) -> ExchangeFuture<'a, ExchangedTokens> {
		const GRANT: GrantType = GrantType::RefreshToken;

		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let refresh_secret = RefreshToken::new(refresh_token.to_owned());
			let response = self
				.oauth_client
				.exchange_refresh_token(&refresh_secret)
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(GRANT, meta.take(), err, self.error_mapper.as_ref()))?;

			map_token_response(GRANT, response)
		})
	}
}
impl<C, M> Debug for TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchangeClient")
			.field("client_id", self.oauth_client.client_id())
			.field("token_url", self.oauth_client.token_uri())
			.finish()
	}
}

fn map_token_response(grant: GrantType, response: OidcTokenResponse) -> Result<ExchangedTokens> {
	let expires_in = response
		.expires_in()
		.map(|value| {
			let secs = i64::try_from(value.as_secs())
				.map_err(|_| TokenEndpointError::ExpiresInOutOfRange)?;

			if secs <= 0 {
				return Err(TokenEndpointError::NonPositiveExpiresIn);
			}

			Ok(Duration::seconds(secs))
		})
		.transpose()?;

	tracing::debug!(
		%grant,
		refresh_token = response.refresh_token().is_some(),
		access_token = response.issued_access_token().is_some(),
		id_token = response.id_token().is_some(),
		"Token endpoint returned a token response."
	);

	Ok(ExchangedTokens {
		access_token: response
			.issued_access_token()
			.map(|token| TokenSecret::new(token.secret().clone())),
		refresh_token: response.refresh_token().map(|token| TokenSecret::new(token.secret().clone())),
		id_token: response.id_token().map(TokenSecret::new),
		expires_in,
	})
}

fn map_request_error<E, M>(
	grant: GrantType,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => {
			let error = response.error().as_ref().to_owned();
			let reason = response.error_description().cloned().unwrap_or_else(|| error.clone());

			TokenEndpointError::Rejected { grant, error, reason, status: meta_status(meta) }.into()
		},
		RequestTokenError::Request(error) => mapper.map_transport_error(grant, meta, error),
		RequestTokenError::Parse(source, _body) =>
			TokenEndpointError::MalformedResponse { grant, source, status: meta_status(meta) }
				.into(),
		RequestTokenError::Other(message) =>
			TokenEndpointError::UnexpectedResponse { grant, message, status: meta_status(meta) }
				.into(),
	}
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn descriptor(methods: &[&str]) -> ProviderDescriptor {
		ProviderDescriptor::builder("https://idp.example.com")
			.authorization_endpoint(
				Url::parse("https://idp.example.com/authorize")
					.expect("Failed to parse authorization endpoint URL."),
			)
			.token_endpoint(
				Url::parse("https://idp.example.com/token")
					.expect("Failed to parse token endpoint URL."),
			)
			.token_endpoint_auth_methods(methods.iter().copied())
			.build()
			.expect("Failed to build provider descriptor.")
	}

	#[test]
	fn builds_basic_and_post_clients() {
		for methods in [&["client_secret_basic"][..], &["client_secret_post"][..]] {
			let client = <TokenExchangeClient>::from_descriptor(
				&descriptor(methods),
				"client-id",
				&TokenSecret::new("secret"),
				ReqwestHttpClient::default(),
				ReqwestTransportErrorMapper,
			);

			assert!(client.is_ok());
		}
	}

	#[test]
	fn token_response_requires_positive_expiry() {
		let response: OidcTokenResponse = serde_json::from_value(serde_json::json!({
			"access_token": "at",
			"token_type": "Bearer",
			"expires_in": 0,
			"id_token": "a.b.c",
		}))
		.expect("Token response fixture should deserialize.");
		let err = map_token_response(GrantType::AuthorizationCode, response)
			.expect_err("Zero expires_in should be rejected.");

		assert!(matches!(err, Error::TokenEndpoint(TokenEndpointError::NonPositiveExpiresIn)));
	}

	#[test]
	fn token_response_keeps_optional_fields_absent() {
		let response: OidcTokenResponse = serde_json::from_value(serde_json::json!({
			"access_token": "at",
			"token_type": "bearer",
		}))
		.expect("Token response fixture should deserialize.");
		let tokens = map_token_response(GrantType::RefreshToken, response)
			.expect("Minimal refresh response should map.");

		assert_eq!(tokens.access_token.as_ref().map(TokenSecret::expose), Some("at"));
		assert!(tokens.refresh_token.is_none());
		assert!(tokens.id_token.is_none());
		assert!(tokens.expires_in.is_none());
	}

	#[test]
	fn token_response_without_access_token_or_type_still_parses() {
		let response: OidcTokenResponse = serde_json::from_value(serde_json::json!({
			"id_token": "a.b.c",
			"expires_in": 3600,
		}))
		.expect("Token response without access_token should deserialize.");

		assert_eq!(response.token_type(), &BasicTokenType::Bearer);

		let tokens = map_token_response(GrantType::AuthorizationCode, response)
			.expect("Response without access_token should map.");

		assert!(tokens.access_token.is_none());
		assert_eq!(tokens.id_token.as_ref().map(TokenSecret::expose), Some("a.b.c"));
		assert_eq!(tokens.expires_in, Some(Duration::hours(1)));
	}

	#[test]
	fn token_type_is_case_insensitive() {
		let response: OidcTokenResponse =
			serde_json::from_value(serde_json::json!({ "access_token": "at", "token_type": "BEARER" }))
				.expect("Token response fixture should deserialize.");

		assert_eq!(response.token_type(), &BasicTokenType::Bearer);
	}
}

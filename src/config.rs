//! Process configuration read from flags, the environment, and an optional `.env` file.
//!
//! [`Settings`] is the raw clap surface; [`Settings::into_config`] validates it into a
//! [`BffConfig`]. Validation failures are [`ConfigError`]s and stop the process before any
//! listener is bound.

// std
use std::{net::IpAddr, path::PathBuf};
// crates.io
use axum::http::HeaderValue;
use clap::Parser;
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	error::ConfigError,
	store::{FileStore, MemoryStore, SessionStore, StoreError},
};

/// Raw settings, each overridable by flag or environment variable.
#[derive(Clone, Debug, Parser)]
#[command(name = "oauth2-bff", version, about)]
pub struct Settings {
	/// Issuer URL of the OpenID Connect provider.
	#[arg(long, env = "OIDC_ISSUER_URL")]
	pub issuer_url: Option<String>,
	/// Client identifier registered with the provider.
	#[arg(long, env = "CLIENT_ID")]
	pub client_id: Option<String>,
	/// Client secret registered with the provider.
	#[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: Option<String>,
	/// Redirect URI registered with the provider; the SPA page handling the callback.
	#[arg(long, env = "REDIRECT_URL")]
	pub redirect_url: Option<String>,
	/// Space-delimited scopes; must include `openid`.
	#[arg(long, env = "OIDC_SCOPE", default_value = "openid profile")]
	pub scope: String,
	/// Where the provider sends the browser after logout. Defaults to the redirect URI.
	#[arg(long, env = "POST_LOGOUT_REDIRECT_URL")]
	pub post_logout_redirect_url: Option<String>,
	/// Session backend: `memory` or `file:<path>`.
	#[arg(long, env = "SESSION_STORE", default_value = "memory")]
	pub session_store: String,
	/// Session lifetime in seconds.
	#[arg(long, env = "SESSION_TTL_SECS", default_value_t = 43_200)]
	pub session_ttl_secs: i64,
	/// Secret used to sign the session cookie. A random key is used when unset.
	#[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
	pub session_secret: Option<String>,
	/// Name of the session cookie.
	#[arg(long, env = "SESSION_COOKIE_NAME", default_value = "bff.sid")]
	pub cookie_name: String,
	/// Always mark the session cookie `Secure`.
	#[arg(long, env = "COOKIE_SECURE")]
	pub cookie_secure: bool,
	/// Comma-separated origins allowed to call the API with credentials.
	#[arg(long, env = "CORS_ALLOW_ORIGIN", value_delimiter = ',')]
	pub cors_allow_origin: Vec<String>,
	/// Number of reverse proxies whose `X-Forwarded-Proto` is trusted.
	#[arg(long, env = "CONFIG_TRUST_PROXIES", default_value_t = 0)]
	pub trust_proxies: u32,
	/// Path prefix for every endpoint.
	#[arg(long, env = "BASE_PATH", default_value = "/")]
	pub base_path: String,
	/// Listening port.
	#[arg(long, env = "CLIENT_PORT", default_value_t = 5010)]
	pub port: u16,
	/// Listening address.
	#[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
	pub bind_address: IpAddr,
	/// Timeout in seconds for every request to the provider.
	#[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = 10)]
	pub provider_timeout_secs: u64,
}
impl Settings {
	/// Loads `.env` (when present) and parses flags plus environment.
	pub fn load() -> Self {
		dotenvy::dotenv().ok();

		Self::parse()
	}

	/// Validates the settings.
	pub fn into_config(self) -> Result<BffConfig, ConfigError> {
		let issuer = parse_url("OIDC_ISSUER_URL", required("OIDC_ISSUER_URL", self.issuer_url)?)?;
		let client_id = required("CLIENT_ID", self.client_id)?;
		let client_secret = TokenSecret::new(required("CLIENT_SECRET", self.client_secret)?);
		let redirect_uri = parse_url("REDIRECT_URL", required("REDIRECT_URL", self.redirect_url)?)?;
		let post_logout_redirect_uri = match self.post_logout_redirect_url {
			Some(raw) if !raw.trim().is_empty() => parse_url("POST_LOGOUT_REDIRECT_URL", raw)?,
			_ => redirect_uri.clone(),
		};
		let scope = ScopeSet::parse_delimited(&self.scope)?;

		if !scope.contains("openid") {
			return Err(ConfigError::MissingOpenidScope);
		}
		if self.session_ttl_secs <= 0 {
			return Err(ConfigError::NonPositiveSessionTtl);
		}
		if self.provider_timeout_secs == 0 {
			return Err(ConfigError::NonPositiveTimeout);
		}

		let cors_allow_origins = self
			.cors_allow_origin
			.iter()
			.map(|origin| origin.trim())
			.filter(|origin| !origin.is_empty())
			.map(|origin| {
				HeaderValue::from_str(origin)
					.map(|_| origin.to_owned())
					.map_err(|_| ConfigError::InvalidCorsOrigin { origin: origin.to_owned() })
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(BffConfig {
			issuer,
			client: ClientRegistration {
				client_id,
				client_secret,
				redirect_uri,
				post_logout_redirect_uri,
				scope,
			},
			session: SessionConfig {
				store: self.session_store.parse()?,
				ttl: Duration::seconds(self.session_ttl_secs),
				secret: self.session_secret.filter(|s| !s.is_empty()).map(TokenSecret::new),
				cookie_name: self.cookie_name,
				cookie_secure: self.cookie_secure,
			},
			server: ServerConfig {
				bind_address: self.bind_address,
				port: self.port,
				base_path: normalize_base_path(&self.base_path)?,
				cors_allow_origins,
				trust_proxies: self.trust_proxies,
			},
			provider_timeout: std::time::Duration::from_secs(self.provider_timeout_secs),
		})
	}
}

/// Validated configuration for the whole process.
#[derive(Clone, Debug)]
pub struct BffConfig {
	/// Issuer URL used for discovery.
	pub issuer: Url,
	/// OAuth client registration.
	pub client: ClientRegistration,
	/// Session storage and cookie settings.
	pub session: SessionConfig,
	/// Listener and HTTP surface settings.
	pub server: ServerConfig,
	/// Timeout applied to every provider request.
	pub provider_timeout: std::time::Duration,
}

/// Confidential client registration at the provider.
#[derive(Clone, Debug)]
pub struct ClientRegistration {
	/// Client identifier; also the expected ID-token audience.
	pub client_id: String,
	/// Client secret; also the key for HMAC-signed ID tokens.
	pub client_secret: TokenSecret,
	/// Redirect URI sent in the authorization request and the code exchange.
	pub redirect_uri: Url,
	/// `post_logout_redirect_uri` for RP-initiated logout.
	pub post_logout_redirect_uri: Url,
	/// Requested scopes.
	pub scope: ScopeSet,
}

/// Session backend selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStoreConfig {
	/// In-process [`MemoryStore`].
	Memory,
	/// JSON snapshot [`FileStore`] at the given path.
	File(PathBuf),
}
impl SessionStoreConfig {
	/// Opens the configured backend with the given TTL.
	pub fn open(&self, ttl: Duration) -> Result<Arc<dyn SessionStore>, StoreError> {
		Ok(match self {
			SessionStoreConfig::Memory => Arc::new(MemoryStore::new(ttl)),
			SessionStoreConfig::File(path) => Arc::new(FileStore::open(path.clone(), ttl)?),
		})
	}
}
impl FromStr for SessionStoreConfig {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let spec = s.trim();

		if spec.eq_ignore_ascii_case("memory") {
			return Ok(Self::Memory);
		}

		match spec.split_once(':') {
			Some(("file", path)) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
			_ => Err(ConfigError::InvalidSessionStore { spec: spec.to_owned() }),
		}
	}
}

/// Session storage and cookie settings.
#[derive(Clone, Debug)]
pub struct SessionConfig {
	/// Backend selection.
	pub store: SessionStoreConfig,
	/// Session lifetime; also the cookie `Max-Age`.
	pub ttl: Duration,
	/// Cookie signing secret.
	pub secret: Option<TokenSecret>,
	/// Cookie name.
	pub cookie_name: String,
	/// Force the `Secure` attribute.
	pub cookie_secure: bool,
}

/// Listener and HTTP surface settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
	/// Listening address.
	pub bind_address: IpAddr,
	/// Listening port.
	pub port: u16,
	/// Normalized path prefix: `/` or `/segment` without a trailing slash.
	pub base_path: String,
	/// Origins allowed by CORS.
	pub cors_allow_origins: Vec<String>,
	/// Trusted reverse-proxy hops.
	pub trust_proxies: u32,
}

fn required(name: &'static str, value: Option<String>) -> Result<String, ConfigError> {
	value.filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Missing { name })
}

fn parse_url(name: &'static str, raw: String) -> Result<Url, ConfigError> {
	Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { name, source })
}

fn normalize_base_path(raw: &str) -> Result<String, ConfigError> {
	let path = raw.trim();

	if !path.starts_with('/') {
		return Err(ConfigError::InvalidBasePath { path: path.to_owned() });
	}

	let trimmed = path.trim_end_matches('/');

	Ok(if trimmed.is_empty() { "/".to_owned() } else { trimmed.to_owned() })
}

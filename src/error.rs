//! Crate-level error types shared across flows, providers, stores, and the HTTP surface.

// self
use crate::{_prelude::*, auth::IdTokenError, oauth::GrantType, provider::DiscoveryError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Session store failure; never converted into an authenticated state.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem, including provider discovery at startup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token endpoint rejected the request or answered with something unusable.
	#[error(transparent)]
	TokenEndpoint(#[from] TokenEndpointError),
	/// Transport failure (DNS, TCP, TLS, timeout) while talking to the provider.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// ID token failed signature, claim, or nonce validation.
	#[error(transparent)]
	IdToken(#[from] IdTokenError),
}
impl Error {
	/// Returns `true` when the failure came from the identity provider side of a grant.
	///
	/// Flows destroy the session and report `loggedIn: false` for these instead of surfacing a
	/// server error to the browser.
	pub fn is_upstream(&self) -> bool {
		matches!(self, Self::TokenEndpoint(_) | Self::Transport(_) | Self::IdToken(_))
	}
}

/// Configuration and validation failures; fatal at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required setting was not provided.
	#[error("Required setting `{name}` is not set.")]
	Missing {
		/// Environment variable (or flag) name.
		name: &'static str,
	},
	/// A URL-valued setting could not be parsed.
	#[error("Setting `{name}` is not a valid URL.")]
	InvalidUrl {
		/// Environment variable (or flag) name.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// OpenID Connect requires the `openid` scope.
	#[error("Requested scopes must include `openid`.")]
	MissingOpenidScope,
	/// Base path must be absolute.
	#[error("Base path `{path}` must start with `/`.")]
	InvalidBasePath {
		/// Offending base path.
		path: String,
	},
	/// Session store specification is not understood.
	#[error("Session store `{spec}` is not supported; use `memory` or `file:<path>`.")]
	InvalidSessionStore {
		/// Offending store specification.
		spec: String,
	},
	/// Session TTL must be positive.
	#[error("Session TTL must be positive.")]
	NonPositiveSessionTtl,
	/// Provider timeout must be positive.
	#[error("Provider timeout must be positive.")]
	NonPositiveTimeout,
	/// CORS origin cannot be used as a header value.
	#[error("CORS origin `{origin}` is invalid.")]
	InvalidCorsOrigin {
		/// Offending origin.
		origin: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider discovery failed.
	#[error(transparent)]
	Discovery(#[from] DiscoveryError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token endpoint failures for code exchanges and refreshes.
#[derive(Debug, ThisError)]
pub enum TokenEndpointError {
	/// Provider answered with an OAuth error response.
	#[error("Provider rejected the {grant} grant: {reason}.")]
	Rejected {
		/// Grant that was attempted.
		grant: GrantType,
		/// OAuth `error` code.
		error: String,
		/// Human-readable reason (`error_description` when supplied).
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider returned a response that is neither a token response nor an OAuth error.
	#[error("Token endpoint returned an unexpected response to the {grant} grant: {message}.")]
	UnexpectedResponse {
		/// Grant that was attempted.
		grant: GrantType,
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON for the {grant} grant.")]
	MalformedResponse {
		/// Grant that was attempted.
		grant: GrantType,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token response omitted the ID token.
	#[error("Token endpoint response to the {grant} grant is missing an id_token.")]
	MissingIdToken {
		/// Grant that was attempted.
		grant: GrantType,
	},
	/// Token response carried no usable expiry.
	#[error("Token endpoint response to the {grant} grant carries no expiry.")]
	MissingExpiry {
		/// Grant that was attempted.
		grant: GrantType,
	},
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the identity provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the configured provider timeout.
	#[error("Request to the identity provider timed out.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the identity provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

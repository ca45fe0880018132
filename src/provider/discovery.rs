//! One-shot OpenID Connect discovery.

// crates.io
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::TransportError,
	provider::{ProviderDescriptor, ProviderDescriptorError},
};

const WELL_KNOWN_PATH: &str = ".well-known/openid-configuration";

/// Failures raised while resolving provider metadata or key material.
#[derive(Debug, ThisError)]
pub enum DiscoveryError {
	/// Configured issuer cannot be turned into a discovery URL.
	#[error("Issuer `{issuer}` cannot be turned into a discovery URL.")]
	InvalidIssuer {
		/// Configured issuer.
		issuer: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request never produced an HTTP response.
	#[error("Request to `{url}` failed.")]
	Request {
		/// Requested document URL.
		url: String,
		/// Transport failure.
		#[source]
		source: TransportError,
	},
	/// Provider answered with a non-success status.
	#[error("Request to `{url}` returned HTTP {status}.")]
	Status {
		/// Requested document URL.
		url: String,
		/// HTTP status code.
		status: u16,
	},
	/// Document body is not the expected JSON shape.
	#[error("Document at `{url}` is malformed.")]
	Malformed {
		/// Requested document URL.
		url: String,
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Discovery document describes a different issuer.
	#[error("Discovery document issuer `{actual}` does not match the configured `{expected}`.")]
	IssuerMismatch {
		/// Configured issuer.
		expected: String,
		/// Issuer reported by the provider.
		actual: String,
	},
	/// Provider metadata failed validation.
	#[error(transparent)]
	Descriptor(#[from] ProviderDescriptorError),
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
	issuer: String,
	authorization_endpoint: Url,
	token_endpoint: Url,
	#[serde(default)]
	end_session_endpoint: Option<Url>,
	#[serde(default)]
	jwks_uri: Option<Url>,
	#[serde(default)]
	token_endpoint_auth_methods_supported: Vec<String>,
	#[serde(default)]
	id_token_signing_alg_values_supported: Vec<String>,
	#[serde(default)]
	code_challenge_methods_supported: Vec<String>,
}

impl ProviderDescriptor {
	/// Fetches `{issuer}/.well-known/openid-configuration` and validates the result.
	///
	/// The returned descriptor keeps the issuer string exactly as the provider reports it, since
	/// ID tokens must carry that value in `iss`.
	pub async fn discover(http: &ReqwestClient, issuer: &Url) -> Result<Self, DiscoveryError> {
		let url = well_known_url(issuer)?;
		let document = fetch_json::<DiscoveryDocument>(http, &url).await?;

		if !same_issuer(&document.issuer, issuer.as_str()) {
			return Err(DiscoveryError::IssuerMismatch {
				expected: issuer.to_string(),
				actual: document.issuer,
			});
		}

		let mut builder = ProviderDescriptor::builder(document.issuer)
			.authorization_endpoint(document.authorization_endpoint)
			.token_endpoint(document.token_endpoint)
			.token_endpoint_auth_methods(document.token_endpoint_auth_methods_supported)
			.id_token_signing_algs(document.id_token_signing_alg_values_supported)
			.code_challenge_methods(document.code_challenge_methods_supported);

		if let Some(end_session) = document.end_session_endpoint {
			builder = builder.end_session_endpoint(end_session);
		}
		if let Some(jwks) = document.jwks_uri {
			builder = builder.jwks_uri(jwks);
		}

		let descriptor = builder.build()?;

		tracing::info!(
			issuer = %descriptor.issuer,
			client_auth = %descriptor.client_auth_method,
			end_session = descriptor.endpoints.end_session.is_some(),
			"Resolved provider metadata."
		);

		Ok(descriptor)
	}
}

/// GETs `url` and decodes the JSON body, reporting the failing path on malformed documents.
pub(crate) async fn fetch_json<T>(http: &ReqwestClient, url: &Url) -> Result<T, DiscoveryError>
where
	T: DeserializeOwned,
{
	let request_error =
		|e: ReqwestError| DiscoveryError::Request { url: url.to_string(), source: e.into() };
	let response = http
		.get(url.clone())
		.header(ACCEPT, "application/json")
		.send()
		.await
		.map_err(request_error)?;
	let status = response.status();

	if !status.is_success() {
		return Err(DiscoveryError::Status { url: url.to_string(), status: status.as_u16() });
	}

	let body = response.bytes().await.map_err(request_error)?;
	let mut deserializer = serde_json::Deserializer::from_slice(&body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| DiscoveryError::Malformed { url: url.to_string(), source })
}

fn well_known_url(issuer: &Url) -> Result<Url, DiscoveryError> {
	let base = issuer.as_str().trim_end_matches('/');

	Url::parse(&format!("{base}/{WELL_KNOWN_PATH}"))
		.map_err(|source| DiscoveryError::InvalidIssuer { issuer: issuer.to_string(), source })
}

fn same_issuer(reported: &str, configured: &str) -> bool {
	reported.trim_end_matches('/') == configured.trim_end_matches('/')
}

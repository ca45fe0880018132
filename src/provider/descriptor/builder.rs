// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	provider::{ClientAuthMethod, ProviderDescriptor, ProviderEndpoints},
};

const DEFAULT_SIGNING_ALG: &str = "RS256";

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Issuer identifier is required.
	#[error("Missing issuer identifier.")]
	MissingIssuer,
	/// Authorization endpoint is required for the Authorization Code flow.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Provider advertises PKCE methods but not `S256`.
	#[error("Provider does not support the S256 PKCE challenge method.")]
	PkceS256Unsupported,
	/// None of the advertised client authentication methods can be used.
	#[error("Provider supports none of client_secret_basic or client_secret_post: {advertised:?}.")]
	UnsupportedClientAuth {
		/// Methods the provider advertised.
		advertised: Vec<String>,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Issuer identifier for the descriptor being constructed.
	pub issuer: String,
	/// Authorization endpoint.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint used for exchanges and refreshes.
	pub token_endpoint: Option<Url>,
	/// Optional end-session endpoint.
	pub end_session_endpoint: Option<Url>,
	/// Optional JWKS endpoint.
	pub jwks_uri: Option<Url>,
	/// Advertised token endpoint authentication methods.
	pub token_endpoint_auth_methods: Vec<String>,
	/// Advertised ID-token signing algorithms.
	pub id_token_signing_algs: Vec<String>,
	/// Advertised PKCE challenge methods.
	pub code_challenge_methods: Vec<String>,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided issuer.
	pub fn new(issuer: impl Into<String>) -> Self {
		Self {
			issuer: issuer.into(),
			authorization_endpoint: None,
			token_endpoint: None,
			end_session_endpoint: None,
			jwks_uri: None,
			token_endpoint_auth_methods: Vec::new(),
			id_token_signing_algs: Vec::new(),
			code_challenge_methods: Vec::new(),
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the end-session endpoint.
	pub fn end_session_endpoint(mut self, url: Url) -> Self {
		self.end_session_endpoint = Some(url);

		self
	}

	/// Sets the JWKS endpoint.
	pub fn jwks_uri(mut self, url: Url) -> Self {
		self.jwks_uri = Some(url);

		self
	}

	/// Records the advertised token endpoint authentication methods.
	pub fn token_endpoint_auth_methods<I, S>(mut self, methods: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.token_endpoint_auth_methods = methods.into_iter().map(Into::into).collect();

		self
	}

	/// Records the advertised ID-token signing algorithms.
	pub fn id_token_signing_algs<I, S>(mut self, algs: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.id_token_signing_algs = algs.into_iter().map(Into::into).collect();

		self
	}

	/// Records the advertised PKCE challenge methods.
	pub fn code_challenge_methods<I, S>(mut self, methods: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.code_challenge_methods = methods.into_iter().map(Into::into).collect();

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		if self.issuer.trim().is_empty() {
			return Err(ProviderDescriptorError::MissingIssuer);
		}

		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let client_auth_method = ClientAuthMethod::negotiate(&self.token_endpoint_auth_methods)
			.ok_or_else(|| ProviderDescriptorError::UnsupportedClientAuth {
				advertised: self.token_endpoint_auth_methods.clone(),
			})?;
		// Discovery 1.0 makes RS256 the default when the list is absent.
		let id_token_signing_algs = if self.id_token_signing_algs.is_empty() {
			vec![DEFAULT_SIGNING_ALG.to_owned()]
		} else {
			self.id_token_signing_algs
		};
		let endpoints = ProviderEndpoints {
			authorization,
			token,
			end_session: self.end_session_endpoint,
			jwks: self.jwks_uri,
		};
		let descriptor = ProviderDescriptor {
			issuer: self.issuer,
			endpoints,
			client_auth_method,
			token_endpoint_auth_methods: self.token_endpoint_auth_methods,
			id_token_signing_algs,
			code_challenge_methods: self.code_challenge_methods,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		if !self.code_challenge_methods.is_empty()
			&& !self.code_challenge_methods.iter().any(|method| method == "S256")
		{
			return Err(ProviderDescriptorError::PkceS256Unsupported);
		}

		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;

		if let Some(end_session) = self.endpoints.end_session.as_ref() {
			validate_endpoint("end_session", end_session)?;
		}
		if let Some(jwks) = self.endpoints.jwks.as_ref() {
			validate_endpoint("jwks", jwks)?;
		}

		Ok(())
	}
}

/// Accepts HTTPS everywhere and plain HTTP only on loopback hosts.
pub(crate) fn is_secure_or_loopback(url: &Url) -> bool {
	if url.scheme() == "https" {
		return true;
	}
	if url.scheme() != "http" {
		return false;
	}

	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if is_secure_or_loopback(url) {
		Ok(())
	} else {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse descriptor fixture URL.")
	}

	fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptor::builder("https://idp.example.com")
			.authorization_endpoint(url("https://idp.example.com/authorize"))
			.token_endpoint(url("https://idp.example.com/token"))
	}

	#[test]
	fn defaults_fill_in_basic_auth_and_rs256() {
		let descriptor = builder().build().expect("Minimal descriptor should build.");

		assert_eq!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretBasic);
		assert!(descriptor.allows_signing_alg("RS256"));
		assert!(!descriptor.allows_signing_alg("HS256"));
		assert!(descriptor.endpoints.end_session.is_none());
	}

	#[test]
	fn rejects_plain_http_outside_loopback() {
		let err = builder()
			.token_endpoint(url("http://idp.example.com/token"))
			.build()
			.expect_err("Plain HTTP token endpoint should be rejected.");

		assert!(matches!(err, ProviderDescriptorError::InsecureEndpoint { endpoint: "token", .. }));

		builder()
			.token_endpoint(url("http://127.0.0.1:8080/token"))
			.end_session_endpoint(url("http://localhost:8080/logout"))
			.build()
			.expect("Loopback HTTP endpoints should be accepted.");
	}

	#[test]
	fn negotiates_post_when_basic_is_not_offered() {
		let descriptor = builder()
			.token_endpoint_auth_methods(["private_key_jwt", "client_secret_post"])
			.build()
			.expect("Descriptor with client_secret_post should build.");

		assert_eq!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost);

		let err = builder()
			.token_endpoint_auth_methods(["private_key_jwt"])
			.build()
			.expect_err("Descriptor without a secret-based method should fail.");

		assert!(matches!(err, ProviderDescriptorError::UnsupportedClientAuth { .. }));
	}

	#[test]
	fn requires_s256_when_pkce_methods_are_advertised() {
		let err = builder()
			.code_challenge_methods(["plain"])
			.build()
			.expect_err("Providers without S256 should be rejected.");

		assert_eq!(err, ProviderDescriptorError::PkceS256Unsupported);
		builder()
			.code_challenge_methods(["plain", "S256"])
			.build()
			.expect("Providers with S256 should be accepted.");
	}
}

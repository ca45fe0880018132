//! Provider descriptor data structures shared by all flows.
//!
//! A descriptor is produced once at startup (normally through
//! [`ProviderDescriptor::discover`](crate::provider::ProviderDescriptor::discover)) and is never
//! mutated afterwards; flows only hold it by reference.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}
impl ClientAuthMethod {
	/// Returns the registered discovery identifier for the method.
	pub fn as_str(self) -> &'static str {
		match self {
			ClientAuthMethod::ClientSecretBasic => "client_secret_basic",
			ClientAuthMethod::ClientSecretPost => "client_secret_post",
		}
	}

	/// Picks the method to use from a provider's advertised list.
	///
	/// An empty list means the provider did not advertise anything, in which case
	/// `client_secret_basic` applies (OpenID Connect Discovery 1.0, section 3).
	pub fn negotiate<S>(advertised: &[S]) -> Option<Self>
	where
		S: AsRef<str>,
	{
		if advertised.is_empty() {
			return Some(Self::ClientSecretBasic);
		}

		[Self::ClientSecretBasic, Self::ClientSecretPost]
			.into_iter()
			.find(|method| advertised.iter().any(|value| value.as_ref() == method.as_str()))
	}
}
impl Display for ClientAuthMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the browser is redirected to.
	pub authorization: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token: Url,
	/// RP-initiated logout endpoint, when the provider supports it.
	pub end_session: Option<Url>,
	/// JSON Web Key Set used to verify ID-token signatures.
	pub jwks: Option<Url>,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Issuer identifier; ID tokens must carry exactly this `iss`.
	pub issuer: String,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Client authentication method negotiated for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
	/// Raw `token_endpoint_auth_methods_supported` values.
	pub token_endpoint_auth_methods: Vec<String>,
	/// ID-token signing algorithms the provider may use.
	pub id_token_signing_algs: Vec<String>,
	/// PKCE challenge methods advertised by the provider (empty when not advertised).
	pub code_challenge_methods: Vec<String>,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided issuer.
	pub fn builder(issuer: impl Into<String>) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(issuer)
	}

	/// Returns `true` when the provider allows ID tokens signed with `alg`.
	pub fn allows_signing_alg(&self, alg: &str) -> bool {
		self.id_token_signing_algs.iter().any(|candidate| candidate == alg)
	}
}

//! ID-token signature and claim verification.

// crates.io
use jsonwebtoken::{
	Algorithm, DecodingKey, Header, Validation, decode, decode_header,
	errors::Error as JwtError,
	jwk::JwkSet,
};
// self
use crate::{
	_prelude::*,
	auth::{IdTokenClaims, TokenSecret},
	provider::{DiscoveryError, ProviderDescriptor, discovery},
};

/// JOSE names of the algorithms `jsonwebtoken` can verify.
const VERIFIABLE_ALGORITHMS: [(&str, Algorithm); 12] = [
	("HS256", Algorithm::HS256),
	("HS384", Algorithm::HS384),
	("HS512", Algorithm::HS512),
	("RS256", Algorithm::RS256),
	("RS384", Algorithm::RS384),
	("RS512", Algorithm::RS512),
	("PS256", Algorithm::PS256),
	("PS384", Algorithm::PS384),
	("PS512", Algorithm::PS512),
	("ES256", Algorithm::ES256),
	("ES384", Algorithm::ES384),
	("EdDSA", Algorithm::EdDSA),
];

/// Reasons an ID token is refused.
#[derive(Debug, ThisError)]
pub enum IdTokenError {
	/// Token is not a decodable JWT.
	#[error("ID token is not a well-formed JWT.")]
	Malformed(#[source] JwtError),
	/// Header algorithm is not one the provider signs with.
	#[error("ID token algorithm {alg:?} is not accepted for this provider.")]
	DisallowedAlgorithm {
		/// Algorithm named in the JWT header.
		alg: Algorithm,
	},
	/// No key in the provider's JWKS matches the token.
	#[error("No provider signing key matches key id {kid:?}.")]
	UnknownKey {
		/// `kid` named in the JWT header.
		kid: Option<String>,
	},
	/// The JWKS could not be re-fetched while looking for a rotated key.
	#[error("Provider signing keys could not be refreshed.")]
	KeyRefresh(#[source] DiscoveryError),
	/// A JWK could not be turned into a verification key.
	#[error("Provider signing key is unusable.")]
	InvalidKey(#[source] JwtError),
	/// Signature, issuer, audience, or expiry validation failed.
	#[error("ID token failed validation.")]
	Rejected(#[source] JwtError),
	/// `nonce` claim does not match the login attempt.
	#[error("ID token nonce does not match the login attempt.")]
	NonceMismatch,
	/// `sub` claim is absent or empty.
	#[error("ID token has no subject.")]
	MissingSubject,
	/// A refreshed ID token names a different subject.
	#[error("Refreshed ID token belongs to a different subject.")]
	SubjectChanged,
}

/// Verifies ID tokens against the provider's keys and the client registration.
pub struct IdTokenVerifier {
	issuer: String,
	client_id: String,
	client_secret: TokenSecret,
	algorithms: Vec<Algorithm>,
	jwks_uri: Option<Url>,
	http: ReqwestClient,
	keys: RwLock<JwkSet>,
}
impl IdTokenVerifier {
	/// Builds a verifier and fetches the provider's JWKS once.
	pub async fn load(
		descriptor: &ProviderDescriptor,
		client_id: impl Into<String>,
		client_secret: TokenSecret,
		http: ReqwestClient,
	) -> Result<Self, DiscoveryError> {
		let keys = match descriptor.endpoints.jwks.as_ref() {
			Some(uri) => discovery::fetch_json::<JwkSet>(&http, uri).await?,
			None => JwkSet { keys: Vec::new() },
		};

		tracing::debug!(keys = keys.keys.len(), "Loaded provider signing keys.");

		Ok(Self::with_keys(descriptor, client_id, client_secret, http, keys))
	}

	/// Builds a verifier around an already known key set.
	pub fn with_keys(
		descriptor: &ProviderDescriptor,
		client_id: impl Into<String>,
		client_secret: TokenSecret,
		http: ReqwestClient,
		keys: JwkSet,
	) -> Self {
		// Advertised names without a verifier here, such as `none`, are ignored.
		let algorithms = VERIFIABLE_ALGORITHMS
			.into_iter()
			.filter(|(name, _)| descriptor.allows_signing_alg(name))
			.map(|(_, alg)| alg)
			.collect();

		Self {
			issuer: descriptor.issuer.clone(),
			client_id: client_id.into(),
			client_secret,
			algorithms,
			jwks_uri: descriptor.endpoints.jwks.clone(),
			http,
			keys: RwLock::new(keys),
		}
	}

	/// Verifies `raw` and returns its claims.
	///
	/// `expected_nonce` is checked when given; refreshed ID tokens are verified without one.
	pub async fn verify(
		&self,
		raw: &str,
		expected_nonce: Option<&str>,
	) -> Result<IdTokenClaims, IdTokenError> {
		let header = decode_header(raw).map_err(IdTokenError::Malformed)?;

		if !self.algorithms.contains(&header.alg) {
			return Err(IdTokenError::DisallowedAlgorithm { alg: header.alg });
		}

		let key = self.decoding_key(&header).await?;
		let mut validation = Validation::new(header.alg);

		validation.set_issuer(&[self.issuer.as_str()]);
		validation.set_audience(&[self.client_id.as_str()]);
		validation.set_required_spec_claims(&["exp", "iss", "aud"]);

		let claims =
			decode::<IdTokenClaims>(raw, &key, &validation).map_err(IdTokenError::Rejected)?.claims;

		if expected_nonce.is_some_and(|expected| {
			claims.get("nonce").and_then(serde_json::Value::as_str) != Some(expected)
		}) {
			return Err(IdTokenError::NonceMismatch);
		}
		if claims.get("sub").and_then(serde_json::Value::as_str).is_none_or(str::is_empty) {
			return Err(IdTokenError::MissingSubject);
		}

		Ok(claims)
	}

	async fn decoding_key(&self, header: &Header) -> Result<DecodingKey, IdTokenError> {
		if is_hmac(header.alg) {
			return Ok(DecodingKey::from_secret(self.client_secret.expose().as_bytes()));
		}
		if let Some(key) = self.cached_key(header.kid.as_deref()) {
			return key;
		}

		// Unknown key id: the provider may have rotated keys since startup.
		let Some(uri) = self.jwks_uri.as_ref() else {
			return Err(IdTokenError::UnknownKey { kid: header.kid.clone() });
		};
		let keys = discovery::fetch_json::<JwkSet>(&self.http, uri)
			.await
			.map_err(IdTokenError::KeyRefresh)?;

		tracing::info!(keys = keys.keys.len(), "Refreshed provider signing keys.");

		*self.keys.write() = keys;

		self.cached_key(header.kid.as_deref())
			.unwrap_or_else(|| Err(IdTokenError::UnknownKey { kid: header.kid.clone() }))
	}

	fn cached_key(&self, kid: Option<&str>) -> Option<Result<DecodingKey, IdTokenError>> {
		let keys = self.keys.read();
		let jwk = match kid {
			Some(kid) => keys.find(kid),
			None if keys.keys.len() == 1 => keys.keys.first(),
			None => None,
		}?;

		Some(DecodingKey::from_jwk(jwk).map_err(IdTokenError::InvalidKey))
	}
}
impl Debug for IdTokenVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdTokenVerifier")
			.field("issuer", &self.issuer)
			.field("client_id", &self.client_id)
			.field("algorithms", &self.algorithms)
			.field("keys", &self.keys.read().keys.len())
			.finish()
	}
}

fn is_hmac(alg: Algorithm) -> bool {
	matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

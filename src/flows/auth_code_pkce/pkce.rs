//! Random login-attempt values and the RFC 7636 `S256` challenge.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Length of `state` and `nonce`: 32 alphanumerics carry about 190 bits.
pub const STATE_LEN: usize = 32;
/// Length of the PKCE verifier, inside the 43..=128 range RFC 7636 allows.
pub const PKCE_VERIFIER_LEN: usize = 64;
/// The only challenge method the BFF sends.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// PKCE verifier plus its derived challenge.
#[derive(Clone, Debug)]
pub struct PkcePair {
	/// Secret verifier kept in the session until the code exchange.
	pub verifier: TokenSecret,
	/// `base64url(SHA256(verifier))` sent in the authorization request.
	pub challenge: String,
}
impl PkcePair {
	/// Generates a fresh verifier and derives its challenge.
	pub fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = pkce_challenge(&verifier);

		Self { verifier: TokenSecret::new(verifier), challenge }
	}
}

/// Fresh values for one login attempt.
#[derive(Clone, Debug)]
pub struct AttemptSecrets {
	/// CSRF `state`.
	pub state: String,
	/// ID-token `nonce`.
	pub nonce: String,
	/// PKCE pair.
	pub pkce: PkcePair,
}
impl AttemptSecrets {
	/// Draws every value from the thread-local CSPRNG.
	pub fn generate() -> Self {
		Self {
			state: random_string(STATE_LEN),
			nonce: random_string(STATE_LEN),
			pkce: PkcePair::generate(),
		}
	}
}

/// Computes the `S256` code challenge for `verifier`.
pub fn pkce_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

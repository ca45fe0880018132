//! Session cookie policy.

// crates.io
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use sha2::{Digest, Sha512};
// self
use crate::{
	_prelude::*,
	auth::{SessionId, TokenSecret},
	config::{ServerConfig, SessionConfig},
};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Derives the cookie signing key; an unset secret yields a random per-process key.
pub fn signing_key(secret: Option<&TokenSecret>) -> Key {
	match secret {
		// SHA-512 output is exactly the 64 bytes `Key::from` requires.
		Some(secret) => Key::from(Sha512::digest(secret.expose().as_bytes()).as_slice()),
		None => {
			tracing::warn!(
				"SESSION_SECRET is not set; sessions will not survive a restart of this process."
			);

			Key::generate()
		},
	}
}

/// How the session cookie is named, scoped, and secured.
#[derive(Clone, Debug)]
pub struct CookiePolicy {
	/// Cookie name.
	pub name: String,
	/// Cookie `Path`, equal to the base path.
	pub path: String,
	/// Cookie `Max-Age`, equal to the session TTL.
	pub max_age: Duration,
	/// Always mark the cookie `Secure`.
	pub force_secure: bool,
	/// Trusted reverse-proxy hops for `X-Forwarded-Proto`.
	pub trust_proxies: u32,
}
impl CookiePolicy {
	/// Builds the policy from validated configuration.
	pub fn new(session: &SessionConfig, server: &ServerConfig) -> Self {
		Self {
			name: session.cookie_name.clone(),
			path: server.base_path.clone(),
			max_age: session.ttl,
			force_secure: session.cookie_secure,
			trust_proxies: server.trust_proxies,
		}
	}

	/// Reads a syntactically valid session id from the signed jar.
	pub fn session_id(&self, jar: &SignedCookieJar) -> Option<SessionId> {
		jar.get(&self.name).and_then(|cookie| SessionId::new(cookie.value()).ok())
	}

	/// Session cookie carrying `id`.
	pub fn issue(&self, id: &SessionId, headers: &HeaderMap) -> Cookie<'static> {
		Cookie::build((self.name.clone(), id.as_ref().to_owned()))
			.path(self.path.clone())
			.http_only(true)
			.same_site(SameSite::Strict)
			.secure(self.is_secure(headers))
			.max_age(self.max_age)
			.build()
	}

	/// Removal cookie matching [`CookiePolicy::issue`]'s name and path.
	pub fn removal(&self) -> Cookie<'static> {
		Cookie::build(self.name.clone()).path(self.path.clone()).build()
	}

	/// `Secure` when forced, or when the request reached the outermost trusted proxy over TLS.
	pub fn is_secure(&self, headers: &HeaderMap) -> bool {
		if self.force_secure {
			return true;
		}
		if self.trust_proxies == 0 {
			return false;
		}

		let hops = headers
			.get_all(X_FORWARDED_PROTO)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.flat_map(|value| value.split(','))
			.map(str::trim)
			.collect::<Vec<_>>();
		let trusted = hops.len().saturating_sub(self.trust_proxies as usize);

		hops.get(trusted).is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
	}
}

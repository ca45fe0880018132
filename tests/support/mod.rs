//! Shared fixtures: a mock identity provider and a controller wired against it.

#![allow(dead_code)]

// std
use std::{collections::HashMap, sync::Arc};
// crates.io
use httpmock::{Mock, prelude::*};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use oauth2_bff::{
	auth::{ScopeSet, SessionId, TokenSecret, TokenSet},
	config::ClientRegistration,
	flows::{PageLoadOutcome, ReqwestBff},
	reqwest::{Client as ReqwestClient, redirect::Policy},
	session::SessionRecord,
	store::{MemoryStore, SessionStore},
};
use time::{Duration, OffsetDateTime};
use url::Url;

pub const CLIENT_ID: &str = "bff-client";
pub const CLIENT_SECRET: &str = "bff-client-secret-with-enough-entropy";
pub const APP_URL: &str = "https://app.example.com/";
pub const SUBJECT: &str = "user-42";
pub const RSA_A_PEM: &[u8] = include_bytes!("../fixtures/rsa_a.pem");
pub const RSA_B_PEM: &[u8] = include_bytes!("../fixtures/rsa_b.pem");
pub const RSA_A_JWK: &str = include_str!("../fixtures/rsa_a.jwk.json");
pub const RSA_B_JWK: &str = include_str!("../fixtures/rsa_b.jwk.json");

/// Mock provider plus the controller and store pointed at it.
pub struct Harness {
	pub idp: MockServer,
	pub bff: Arc<ReqwestBff>,
	pub store: Arc<MemoryStore>,
	jwks_mock: usize,
}
impl Harness {
	/// Starts the mock provider, serves discovery + JWKS, and runs discovery against it.
	pub async fn start() -> Self {
		Self::start_with(true, serde_json::json!({ "keys": [] })).await
	}

	pub async fn start_with_end_session(end_session: bool) -> Self {
		Self::start_with(end_session, serde_json::json!({ "keys": [] })).await
	}

	/// Like [`Harness::start`], but the provider publishes `jwks`.
	pub async fn start_with_jwks(jwks: serde_json::Value) -> Self {
		Self::start_with(true, jwks).await
	}

	async fn start_with(end_session: bool, jwks: serde_json::Value) -> Self {
		let idp = MockServer::start_async().await;
		let issuer = idp.base_url();
		let mut document = serde_json::json!({
			"issuer": issuer,
			"authorization_endpoint": idp.url("/authorize"),
			"token_endpoint": idp.url("/token"),
			"jwks_uri": idp.url("/jwks"),
			"token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post"],
			"id_token_signing_alg_values_supported": ["RS256", "HS256"],
			"code_challenge_methods_supported": ["S256"],
		});

		if end_session {
			document["end_session_endpoint"] = serde_json::json!(idp.url("/logout"));
		}

		idp.mock_async(|when, then| {
			when.method(GET).path("/.well-known/openid-configuration");
			then.status(200)
				.header("content-type", "application/json")
				.body(document.to_string());
		})
		.await;

		let jwks_mock = serve_jwks(&idp, &jwks).await;
		let store = Arc::new(MemoryStore::default());
		let http = test_http_client();
		let issuer_url = Url::parse(&issuer).expect("Mock issuer should parse.");
		let bff = ReqwestBff::discover(
			&issuer_url,
			client_registration(),
			http,
			store.clone() as Arc<dyn SessionStore>,
		)
		.await
		.expect("Discovery against the mock provider should succeed.");

		Self { idp, bff: Arc::new(bff), store, jwks_mock }
	}

	/// Replaces the published JWKS, as a provider does when it rotates signing keys.
	pub async fn rotate_jwks(&mut self, jwks: serde_json::Value) {
		Mock::new(self.jwks_mock, &self.idp).delete_async().await;

		self.jwks_mock = serve_jwks(&self.idp, &jwks).await;
	}

	/// Handle on the JWKS mock currently being served.
	pub fn jwks_mock(&self) -> Mock<'_> {
		Mock::new(self.jwks_mock, &self.idp)
	}

	pub fn issuer(&self) -> String {
		self.idp.base_url()
	}

	/// Mints an HS256 ID token for [`SUBJECT`] that the controller accepts.
	pub fn id_token(&self, nonce: Option<&str>, lifetime: Duration) -> String {
		sign(&self.claims(nonce, lifetime))
	}

	/// Mints an RS256 ID token signed with the PEM key `pem`, carrying `kid` when given.
	pub fn rs256_id_token(&self, nonce: Option<&str>, pem: &[u8], kid: Option<&str>) -> String {
		let mut header = Header::new(Algorithm::RS256);

		header.kid = kid.map(str::to_owned);

		jsonwebtoken::encode(
			&header,
			&self.claims(nonce, Duration::hours(1)),
			&EncodingKey::from_rsa_pem(pem).expect("RSA key fixture should parse."),
		)
		.expect("Signing the RS256 ID token fixture should succeed.")
	}

	/// Standard claims for [`SUBJECT`] issued by the mock provider.
	pub fn claims(&self, nonce: Option<&str>, lifetime: Duration) -> serde_json::Value {
		let now = OffsetDateTime::now_utc();
		let mut claims = serde_json::json!({
			"iss": self.issuer(),
			"aud": CLIENT_ID,
			"sub": SUBJECT,
			"email": "user42@example.com",
			"iat": now.unix_timestamp(),
			"exp": (now + lifetime).unix_timestamp(),
		});

		if let Some(nonce) = nonce {
			claims["nonce"] = serde_json::json!(nonce);
		}

		claims
	}

	/// Token endpoint mock answering authorization code grants.
	pub async fn mock_code_grant(&self, body: String) -> Mock<'_> {
		self.idp
			.mock_async(|when, then| {
				when.method(POST).path("/token").body_includes("grant_type=authorization_code");
				then.status(200).header("content-type", "application/json").body(body);
			})
			.await
	}

	/// Token endpoint mock answering refresh grants.
	pub async fn mock_refresh_grant(&self, status: u16, body: String) -> Mock<'_> {
		self.idp
			.mock_async(|when, then| {
				when.method(POST).path("/token").body_includes("grant_type=refresh_token");
				then.status(status).header("content-type", "application/json").body(body);
			})
			.await
	}

	/// Runs `start` + `pageload` against a successful code exchange.
	pub async fn login(&self) -> SessionId {
		let (id, outcome) = self
			.login_with(|nonce| {
				token_body(
					Some("access-1"),
					Some("refresh-1"),
					Some(&self.id_token(Some(nonce), Duration::hours(1))),
					Some(3600),
				)
			})
			.await;

		assert!(outcome.logged_in && outcome.handled_auth, "Fixture login should complete.");

		id
	}

	/// Runs `start` + `pageload` with the token endpoint answering the body `respond` builds
	/// from the authorize request's nonce. The token mock is removed afterwards.
	pub async fn login_with(
		&self,
		respond: impl FnOnce(&str) -> String,
	) -> (SessionId, PageLoadOutcome) {
		let (id, start) = self.bff.start(None).await.expect("Start should succeed.");
		let params = query(&start.auth_redir_url);
		let mock = self.mock_code_grant(respond(&params["nonce"])).await;
		let outcome = self
			.bff
			.pageload(Some(&id), &callback_url("code-1", &params["state"]))
			.await
			.expect("Pageload should succeed.");

		mock.assert_calls_async(1).await;
		mock.delete_async().await;

		(id, outcome)
	}

	/// Writes a token set straight into the store.
	pub async fn seed_tokens(&self, expires_at: OffsetDateTime, refresh: Option<&str>) -> SessionId {
		let id = SessionId::generate();
		let raw = self.id_token(None, Duration::hours(1));
		let mut claims = serde_json::Map::new();

		claims.insert("sub".into(), serde_json::json!(SUBJECT));
		claims.insert("email".into(), serde_json::json!("user42@example.com"));

		let tokens = TokenSet {
			id_token: TokenSecret::new(raw),
			id_token_claims: claims,
			access_token: Some(TokenSecret::new("access-seeded")),
			refresh_token: refresh.map(TokenSecret::new),
			expires_at,
		};

		self.store
			.save(&id, SessionRecord { pending: None, tokens: Some(tokens) })
			.await
			.expect("Seeding the store should succeed.");

		id
	}

	pub async fn record(&self, id: &SessionId) -> Option<SessionRecord> {
		self.store.load(id).await.expect("Store load should succeed.")
	}
}

pub fn client_registration() -> ClientRegistration {
	let app = Url::parse(APP_URL).expect("App URL fixture should parse.");

	ClientRegistration {
		client_id: CLIENT_ID.into(),
		client_secret: TokenSecret::new(CLIENT_SECRET),
		redirect_uri: app.clone(),
		post_logout_redirect_uri: app,
		scope: ScopeSet::new(["openid", "profile", "email"]).expect("Scope fixture is valid."),
	}
}

/// Provider client for the mock IdP, which serves a self-signed certificate on `127.0.0.1`.
pub fn test_http_client() -> ReqwestClient {
	ReqwestClient::builder()
		.redirect(Policy::none())
		.timeout(std::time::Duration::from_secs(5))
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Test HTTP client should build.")
}

/// JWK from a fixture file with `kid` set when given.
pub fn jwk(fixture: &str, kid: Option<&str>) -> serde_json::Value {
	let mut jwk: serde_json::Value =
		serde_json::from_str(fixture).expect("JWK fixture should be valid JSON.");

	if let Some(kid) = kid {
		jwk["kid"] = serde_json::json!(kid);
	}

	jwk
}

async fn serve_jwks(idp: &MockServer, jwks: &serde_json::Value) -> usize {
	let body = jwks.to_string();

	idp.mock_async(|when, then| {
		when.method(GET).path("/jwks");
		then.status(200).header("content-type", "application/json").body(body);
	})
	.await
	.id
}

pub fn sign(claims: &serde_json::Value) -> String {
	jsonwebtoken::encode(
		&Header::new(Algorithm::HS256),
		claims,
		&EncodingKey::from_secret(CLIENT_SECRET.as_bytes()),
	)
	.expect("Signing the ID token fixture should succeed.")
}

pub fn token_body(
	access: Option<&str>,
	refresh: Option<&str>,
	id_token: Option<&str>,
	expires_in: Option<i64>,
) -> String {
	let mut body = serde_json::json!({ "token_type": "Bearer" });

	if let Some(access) = access {
		body["access_token"] = serde_json::json!(access);
	}

	if let Some(refresh) = refresh {
		body["refresh_token"] = serde_json::json!(refresh);
	}
	if let Some(id_token) = id_token {
		body["id_token"] = serde_json::json!(id_token);
	}
	if let Some(expires_in) = expires_in {
		body["expires_in"] = serde_json::json!(expires_in);
	}

	body.to_string()
}

pub fn query(url: &Url) -> HashMap<String, String> {
	url.query_pairs().into_owned().collect()
}

pub fn callback_url(code: &str, state: &str) -> String {
	let mut url = Url::parse(APP_URL).expect("App URL fixture should parse.");

	url.query_pairs_mut().append_pair("code", code).append_pair("state", state);

	url.into()
}

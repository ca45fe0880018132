//! axum surface for the browser: routing, CORS, cookies, and the listener.

pub mod cookie;
pub mod routes;

pub use cookie::*;
pub use routes::{ApiError, PageLoadRequest};

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Router,
	extract::FromRef,
	http::{HeaderValue, Method, header},
	routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use tokio::net::TcpListener;
use tower_http::{
	cors::{AllowOrigin, CorsLayer},
	trace::TraceLayer,
};
// self
use crate::{
	_prelude::*,
	config::{BffConfig, ServerConfig},
	error::ConfigError,
	flows::ReqwestBff,
	http::provider_http_client,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
	/// Flow controller.
	pub bff: Arc<ReqwestBff>,
	/// Session cookie policy.
	pub cookie: Arc<CookiePolicy>,
	key: Key,
}
impl AppState {
	/// Bundles the controller with its cookie policy and signing key.
	pub fn new(bff: Arc<ReqwestBff>, cookie: CookiePolicy, key: Key) -> Self {
		Self { bff, cookie: Arc::new(cookie), key }
	}
}
impl Debug for AppState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState").field("bff", &self.bff).field("cookie", &self.cookie).finish()
	}
}
impl FromRef<AppState> for Key {
	fn from_ref(state: &AppState) -> Self {
		state.key.clone()
	}
}

/// Builds the application router, mounted under the configured base path.
pub fn router(state: AppState, server: &ServerConfig) -> Result<Router, ConfigError> {
	let routes = Router::new()
		.route("/start", post(routes::start))
		.route("/pageload", post(routes::pageload))
		.route("/userinfo", get(routes::userinfo))
		.route("/refresh", post(routes::refresh))
		.route("/logout", post(routes::logout));
	let mut app = if server.base_path == "/" {
		routes
	} else {
		Router::new().nest(&server.base_path, routes)
	};

	if !server.cors_allow_origins.is_empty() {
		app = app.layer(cors_layer(&server.cors_allow_origins)?);
	}

	Ok(app.layer(TraceLayer::new_for_http()).with_state(state))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, ConfigError> {
	let origins = origins
		.iter()
		.map(|origin| {
			HeaderValue::from_str(origin)
				.map_err(|_| ConfigError::InvalidCorsOrigin { origin: origin.clone() })
		})
		.collect::<Result<Vec<_>, _>>()?;

	Ok(CorsLayer::new()
		.allow_origin(AllowOrigin::list(origins))
		.allow_credentials(true)
		.allow_methods([Method::GET, Method::POST])
		.allow_headers([header::CONTENT_TYPE]))
}

/// Resolves the provider, binds the listener, and serves until ctrl-c.
pub async fn serve(config: BffConfig) -> color_eyre::Result<()> {
	let http = provider_http_client(config.provider_timeout)?;
	let store = config.session.store.open(config.session.ttl)?;
	let bff = ReqwestBff::discover(&config.issuer, config.client.clone(), http, store).await?;
	let state = AppState::new(
		Arc::new(bff),
		CookiePolicy::new(&config.session, &config.server),
		signing_key(config.session.secret.as_ref()),
	);
	let app = router(state, &config.server)?;
	let addr = SocketAddr::new(config.server.bind_address, config.server.port);
	let listener = TcpListener::bind(addr).await?;

	tracing::info!(
		addr = %listener.local_addr()?,
		base_path = %config.server.base_path,
		"Listening."
	);

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

	Ok(())
}

async fn shutdown_signal() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => tracing::info!("Shutting down."),
		Err(e) => {
			tracing::error!(error = %e, "Failed to install the ctrl-c handler.");

			std::future::pending::<()>().await
		},
	}
}

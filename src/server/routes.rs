//! JSON handlers for the five browser-facing operations.

// crates.io
use axum::{
	Json,
	extract::State,
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
// self
use crate::{
	_prelude::*,
	auth::IdTokenClaims,
	flows::{LogoutOutcome, PageLoadOutcome, RefreshOutcome, StartOutcome},
	server::AppState,
};

/// Request body of `pageload`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLoadRequest {
	/// Full URL the browser is currently showing.
	pub page_url: String,
}

/// Handler-level failure rendered as a JSON error body.
#[derive(Debug)]
pub struct ApiError(Error);
impl From<Error> for ApiError {
	fn from(e: Error) -> Self {
		Self(e)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		// Provider details stay in the logs; the browser only learns the category.
		let (status, code) = match &self.0 {
			Error::Storage(_) => (StatusCode::SERVICE_UNAVAILABLE, "session_store_unavailable"),
			Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_misconfigured"),
			Error::TokenEndpoint(_) | Error::Transport(_) | Error::IdToken(_) =>
				(StatusCode::BAD_GATEWAY, "provider_unavailable"),
		};

		tracing::error!(status = status.as_u16(), error = %self.0, "Request failed.");

		(status, Json(serde_json::json!({ "error": code }))).into_response()
	}
}

type ApiResult<T> = Result<T, ApiError>;

pub(crate) async fn start(
	State(state): State<AppState>,
	headers: HeaderMap,
	jar: SignedCookieJar,
) -> ApiResult<(SignedCookieJar, Json<StartOutcome>)> {
	let current = state.cookie.session_id(&jar);
	let (id, outcome) = state.bff.start(current.as_ref()).await?;
	let jar = jar.add(state.cookie.issue(&id, &headers));

	Ok((jar, Json(outcome)))
}

pub(crate) async fn pageload(
	State(state): State<AppState>,
	jar: SignedCookieJar,
	Json(request): Json<PageLoadRequest>,
) -> ApiResult<Json<PageLoadOutcome>> {
	let current = state.cookie.session_id(&jar);

	Ok(Json(state.bff.pageload(current.as_ref(), &request.page_url).await?))
}

pub(crate) async fn userinfo(
	State(state): State<AppState>,
	jar: SignedCookieJar,
) -> ApiResult<Json<IdTokenClaims>> {
	let current = state.cookie.session_id(&jar);

	Ok(Json(state.bff.userinfo(current.as_ref()).await?))
}

pub(crate) async fn refresh(
	State(state): State<AppState>,
	jar: SignedCookieJar,
) -> ApiResult<Json<RefreshOutcome>> {
	let current = state.cookie.session_id(&jar);

	Ok(Json(state.bff.refresh(current.as_ref()).await?))
}

pub(crate) async fn logout(
	State(state): State<AppState>,
	jar: SignedCookieJar,
) -> ApiResult<(SignedCookieJar, Json<LogoutOutcome>)> {
	let current = state.cookie.session_id(&jar);
	let outcome = state.bff.logout(current.as_ref()).await?;

	Ok((jar.remove(state.cookie.removal()), Json(outcome)))
}

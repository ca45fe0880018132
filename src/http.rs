//! HTTP transport used for every call to the identity provider.
//!
//! [`TokenHttpClient`] is the token-exchange client's only dependency on an HTTP stack: it hands
//! out short-lived [`AsyncHttpClient`] handles for the `oauth2` crate, each tied to a
//! [`ResponseMetadataSlot`] so error mapping can report the HTTP status of a failed grant.
//! [`provider_http_client`] builds the reqwest client shared by discovery, JWKS fetches, and
//! token requests.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

/// Builds the reqwest client used to talk to the provider.
///
/// Redirects are never followed: token endpoints answer directly, and following a redirect could
/// forward client credentials to another origin.
pub fn provider_http_client(timeout: std::time::Duration) -> Result<ReqwestClient, ConfigError> {
	Ok(ReqwestClient::builder()
		.redirect(Policy::none())
		.timeout(timeout)
		.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
		.build()?)
}

/// HTTP transport able to execute token requests while publishing response metadata.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// request task, and the handles they return must own their state so request futures stay
/// `Send` while in flight.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle that records response metadata in `slot`.
	///
	/// Handles clear the slot before dispatching and store the status once a response arrives,
	/// so metadata never leaks between requests.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Metadata captured from the most recent token endpoint response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot sharing [`ResponseMetadata`] between the transport and error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// [`TokenHttpClient`] backed by [`ReqwestClient`].
///
/// Build the inner client with [`provider_http_client`] (or at least with redirects disabled).
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		InstrumentedHandle(Arc::new(Instrumented { client: self.0.clone(), slot }))
	}
}

struct Instrumented {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Handle returned by [`ReqwestHttpClient::with_metadata`].
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<Instrumented>);
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let inner = Arc::clone(&self.0);

		Box::pin(async move {
			inner.slot.take();

			let response = inner
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			inner.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut converted =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

//! Backend-for-Frontend OAuth 2.0 / OpenID Connect login broker.
//!
//! The crate runs the Authorization Code + PKCE flow on behalf of a browser, keeps the resulting
//! token set in a server-side session, and only ever hands the browser an opaque session cookie
//! plus the ID-token claims. [`flows::Bff`] is the flow controller; [`server`] wires it into an
//! axum router exposing `/start`, `/pageload`, `/userinfo`, `/refresh`, and `/logout`.

#![deny(clippy::all, missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod server;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;

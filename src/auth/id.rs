//! Opaque session identifiers carried in the browser cookie.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
// self
use crate::_prelude::*;

const SESSION_ID_BYTES: usize = 32;
const SESSION_ID_MAX_LEN: usize = 128;

/// Error returned when a session identifier fails validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum SessionIdError {
	/// The identifier was empty.
	#[error("Session identifier cannot be empty.")]
	Empty,
	/// The identifier contains characters outside the URL-safe base64 alphabet.
	#[error("Session identifier contains invalid characters.")]
	InvalidCharacter,
	/// The identifier exceeded the allowed character count.
	#[error("Session identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Unguessable identifier addressing one session record.
///
/// Fresh identifiers carry 256 bits from the thread-local CSPRNG. Identifiers read back from a
/// cookie are only syntax-checked; whether they name a live session is the store's call.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);
impl SessionId {
	/// Mints a new random identifier.
	pub fn generate() -> Self {
		let mut bytes = [0_u8; SESSION_ID_BYTES];

		rand::rng().fill(&mut bytes);

		Self(URL_SAFE_NO_PAD.encode(bytes))
	}

	/// Wraps an existing identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, SessionIdError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for SessionId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for SessionId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for SessionId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<SessionId> for String {
	fn from(value: SessionId) -> Self {
		value.0
	}
}
impl TryFrom<String> for SessionId {
	type Error = SessionIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl FromStr for SessionId {
	type Err = SessionIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
// Session ids are bearer credentials for the session; keep them out of logs.
impl Debug for SessionId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let prefix: String = self.0.chars().take(6).collect();

		write!(f, "SessionId({prefix}…)")
	}
}
impl Display for SessionId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Debug::fmt(self, f)
	}
}

fn validate_view(view: &str) -> Result<(), SessionIdError> {
	if view.is_empty() {
		return Err(SessionIdError::Empty);
	}
	if view.len() > SESSION_ID_MAX_LEN {
		return Err(SessionIdError::TooLong { max: SESSION_ID_MAX_LEN });
	}
	if !view.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
		return Err(SessionIdError::InvalidCharacter);
	}

	Ok(())
}

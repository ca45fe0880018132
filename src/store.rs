//! Storage contract and built-in session store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::SessionId, session::SessionRecord};

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Default session lifetime: twelve hours.
pub const DEFAULT_SESSION_TTL: Duration = Duration::hours(12);

/// Storage backend contract for session records.
///
/// Implementations enforce their own TTL: a record whose lifetime elapsed must load as `None`.
/// Writes are last-writer-wins per session id.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Fetches the live record for `id`, if any.
	fn load<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<SessionRecord>>;

	/// Persists or replaces the record for `id` and restarts its TTL.
	fn save<'a>(&'a self, id: &'a SessionId, record: SessionRecord) -> StoreFuture<'a, ()>;

	/// Removes the record for `id`. Removing an unknown id succeeds.
	fn destroy<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Stored record plus its absolute expiry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
	/// Session payload.
	pub record: SessionRecord,
	/// Instant after which the entry is treated as absent.
	#[serde(with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
}
impl SessionEntry {
	/// Wraps `record` with a lifetime of `ttl` starting at `now`.
	pub fn new(record: SessionRecord, ttl: Duration, now: OffsetDateTime) -> Self {
		Self { record, expires_at: now + ttl }
	}

	/// Returns `true` while the entry is still within its lifetime.
	pub fn is_live_at(&self, now: OffsetDateTime) -> bool {
		now < self.expires_at
	}
}

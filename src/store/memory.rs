//! Thread-safe in-memory [`SessionStore`], the default backend.

// self
use crate::{
	_prelude::*,
	auth::SessionId,
	session::SessionRecord,
	store::{DEFAULT_SESSION_TTL, SessionEntry, SessionStore, StoreError, StoreFuture},
};

type SessionMap = Arc<RwLock<HashMap<SessionId, SessionEntry>>>;

/// Keeps session records in-process; every record is lost on restart.
#[derive(Clone, Debug)]
pub struct MemoryStore {
	sessions: SessionMap,
	ttl: Duration,
}
impl MemoryStore {
	/// Creates an empty store whose records live for `ttl` after their last write.
	pub fn new(ttl: Duration) -> Self {
		Self { sessions: Default::default(), ttl }
	}

	/// Number of entries currently held, including expired ones not yet swept.
	pub fn len(&self) -> usize {
		self.sessions.read().len()
	}

	/// Returns `true` when no entries are held.
	pub fn is_empty(&self) -> bool {
		self.sessions.read().is_empty()
	}

	fn load_now(map: &SessionMap, id: &SessionId, now: OffsetDateTime) -> Option<SessionRecord> {
		{
			let guard = map.read();

			match guard.get(id) {
				Some(entry) if entry.is_live_at(now) => return Some(entry.record.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		// Expired: drop it so the map does not grow without bound.
		map.write().remove(id);

		None
	}

	fn save_now(
		map: &SessionMap,
		id: &SessionId,
		record: SessionRecord,
		ttl: Duration,
		now: OffsetDateTime,
	) -> Result<(), StoreError> {
		let mut guard = map.write();

		guard.retain(|_, entry| entry.is_live_at(now));
		guard.insert(id.clone(), SessionEntry::new(record, ttl, now));

		Ok(())
	}
}
impl Default for MemoryStore {
	fn default() -> Self {
		Self::new(DEFAULT_SESSION_TTL)
	}
}
impl SessionStore for MemoryStore {
	fn load<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<SessionRecord>> {
		Box::pin(async move { Ok(Self::load_now(&self.sessions, id, OffsetDateTime::now_utc())) })
	}

	fn save<'a>(&'a self, id: &'a SessionId, record: SessionRecord) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			Self::save_now(&self.sessions, id, record, self.ttl, OffsetDateTime::now_utc())
		})
	}

	fn destroy<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.sessions.write().remove(id);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::session::PendingAttempt;

	fn record() -> SessionRecord {
		SessionRecord {
			pending: Some(PendingAttempt {
				state: "state".into(),
				nonce: "nonce".into(),
				pkce_verifier: crate::auth::TokenSecret::new("verifier"),
			}),
			tokens: None,
		}
	}

	#[test]
	fn entries_expire_after_ttl() {
		let store = MemoryStore::new(Duration::minutes(5));
		let id = SessionId::generate();
		let now = OffsetDateTime::now_utc();

		MemoryStore::save_now(&store.sessions, &id, record(), store.ttl, now)
			.expect("Saving into memory should succeed.");

		assert!(MemoryStore::load_now(&store.sessions, &id, now + Duration::minutes(4)).is_some());
		assert!(MemoryStore::load_now(&store.sessions, &id, now + Duration::minutes(5)).is_none());
		assert!(store.is_empty(), "Expired entries should be removed on load.");
	}

	#[test]
	fn saving_sweeps_other_expired_entries() {
		let store = MemoryStore::new(Duration::minutes(5));
		let stale = SessionId::generate();
		let fresh = SessionId::generate();
		let now = OffsetDateTime::now_utc();

		MemoryStore::save_now(&store.sessions, &stale, record(), store.ttl, now)
			.expect("Saving the stale entry should succeed.");
		MemoryStore::save_now(
			&store.sessions,
			&fresh,
			record(),
			store.ttl,
			now + Duration::minutes(10),
		)
		.expect("Saving the fresh entry should succeed.");

		assert_eq!(store.len(), 1);
	}

	#[tokio::test]
	async fn destroy_is_idempotent() {
		let store = MemoryStore::default();
		let id = SessionId::generate();

		store.save(&id, record()).await.expect("Save should succeed.");
		store.destroy(&id).await.expect("First destroy should succeed.");
		store.destroy(&id).await.expect("Second destroy should succeed.");

		assert!(store.load(&id).await.expect("Load should succeed.").is_none());
	}
}

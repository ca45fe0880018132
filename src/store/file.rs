//! File-backed [`SessionStore`] that survives restarts of a single-instance deployment.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::SessionId,
	session::SessionRecord,
	store::{SessionEntry, SessionStore, StoreError, StoreFuture},
};

/// Persists session entries to a JSON snapshot after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	ttl: Duration,
	inner: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
}
impl FileStore {
	/// Opens (or creates) a store at `path`, eagerly loading live entries.
	pub fn open(path: impl Into<PathBuf>, ttl: Duration) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let now = OffsetDateTime::now_utc();
		let mut snapshot = Self::load_snapshot(&path)?;

		snapshot.retain(|_, entry| entry.is_live_at(now));

		tracing::info!(path = %path.display(), sessions = snapshot.len(), "Opened file session store.");

		Ok(Self { path, ttl, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<SessionId, SessionEntry>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let entries: Vec<(SessionId, SessionEntry)> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(entries.into_iter().collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<SessionId, SessionEntry>) -> Result<(), StoreError> {
		let snapshot: Vec<_> = contents.iter().collect();
		let serialized = serde_json::to_vec(&snapshot).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize session snapshot: {e}"),
		})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl SessionStore for FileStore {
	fn load<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, Option<SessionRecord>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			Ok(self
				.inner
				.read()
				.get(id)
				.filter(|entry| entry.is_live_at(now))
				.map(|entry| entry.record.clone()))
		})
	}

	fn save<'a>(&'a self, id: &'a SessionId, record: SessionRecord) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let mut guard = self.inner.write();

			guard.retain(|_, entry| entry.is_live_at(now));
			guard.insert(id.clone(), SessionEntry::new(record, self.ttl, now));
			self.persist_locked(&guard)
		})
	}

	fn destroy<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if guard.remove(id).is_some() {
				self.persist_locked(&guard)?;
			}

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;
	use crate::{auth::TokenSecret, session::PendingAttempt};

	fn temp_path() -> PathBuf {
		let unique = format!(
			"oauth2_bff_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn record() -> SessionRecord {
		SessionRecord {
			pending: Some(PendingAttempt {
				state: "state-1".into(),
				nonce: "nonce-1".into(),
				pkce_verifier: TokenSecret::new("verifier-1"),
			}),
			tokens: None,
		}
	}

	#[tokio::test]
	async fn save_and_reload_round_trip() {
		let path = temp_path();
		let store =
			FileStore::open(&path, Duration::hours(1)).expect("Failed to open file store snapshot.");
		let id = SessionId::generate();

		store.save(&id, record()).await.expect("Failed to save fixture record to file store.");
		drop(store);

		let reopened = FileStore::open(&path, Duration::hours(1))
			.expect("Failed to reopen file store snapshot.");
		let fetched = reopened
			.load(&id)
			.await
			.expect("Failed to load fixture record from file store.")
			.expect("File store lost record after reopen.");

		assert_eq!(fetched, record());

		reopened.destroy(&id).await.expect("Destroy should succeed.");

		assert!(reopened.load(&id).await.expect("Load should succeed.").is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshot_is_a_serialization_error() {
		let path = temp_path();

		fs::write(&path, b"not json").expect("Failed to write corrupt snapshot fixture.");

		let err = FileStore::open(&path, Duration::hours(1))
			.expect_err("Corrupt snapshot should fail to open.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}

//! Shared helpers for controller operations (per-session guards, expiry resolution,
//! outcome recording).

// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{
	_prelude::*,
	auth::{IdTokenClaims, SessionId},
	flows::{Bff, GuardMap},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Exclusive hold on one session id, released (and pruned when idle) on drop.
pub(crate) struct SessionLock {
	_held: MutexGuardArc<()>,
	guards: GuardMap,
	id: SessionId,
}
impl Drop for SessionLock {
	fn drop(&mut self) {
		let mut guards = self.guards.lock();

		// One reference lives in the map and one in `_held`; anything more is a waiter.
		if guards.get(&self.id).is_some_and(|mutex| Arc::strong_count(mutex) <= 2) {
			guards.remove(&self.id);
		}
	}
}

/// Serializes operations on `id` within this process.
pub(crate) async fn session_guard<C, M>(bff: &Bff<C, M>, id: &SessionId) -> SessionLock
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mutex = {
		let mut guards = bff.session_guards.lock();

		guards.entry(id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	};
	let held = mutex.lock_arc().await;

	SessionLock { _held: held, guards: bff.session_guards.clone(), id: id.clone() }
}

/// Absolute expiry from `expires_in`, falling back to the ID token's `exp`.
pub(crate) fn resolve_expiry(
	now: OffsetDateTime,
	expires_in: Option<Duration>,
	claims: Option<&IdTokenClaims>,
) -> Option<OffsetDateTime> {
	if let Some(lifetime) = expires_in {
		return now.checked_add(lifetime);
	}

	claims
		.and_then(|claims| claims.get("exp"))
		.and_then(serde_json::Value::as_i64)
		.and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
}

/// Runs `fut` inside a flow span and records attempt + outcome.
pub(crate) async fn observe<F, T>(kind: FlowKind, stage: &'static str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	obs::record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(e) => {
			tracing::error!(flow = %kind, error = %e, "Flow failed.");

			obs::record_flow_outcome(kind, FlowOutcome::Failure);
		},
	}

	result
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn expires_in_wins_over_id_token_exp() {
		let now = datetime!(2030-01-01 00:00 UTC);
		let mut claims = IdTokenClaims::new();

		claims.insert("exp".into(), serde_json::json!(1_893_459_600_i64));

		assert_eq!(
			resolve_expiry(now, Some(Duration::minutes(5)), Some(&claims)),
			Some(datetime!(2030-01-01 00:05 UTC))
		);
		assert_eq!(resolve_expiry(now, None, Some(&claims)), Some(datetime!(2030-01-01 01:00 UTC)));
		assert_eq!(resolve_expiry(now, None, None), None);
	}
}

mod support;

// crates.io
use serde_json::json;
// self
use support::*;

fn code_body(id_token: &str) -> String {
	token_body(Some("access-1"), Some("refresh-1"), Some(id_token), Some(3600))
}

#[tokio::test]
async fn rs256_token_verifies_against_the_key_named_by_kid() {
	let harness = Harness::start_with_jwks(json!({
		"keys": [jwk(RSA_B_JWK, Some("key-b")), jwk(RSA_A_JWK, Some("key-a"))],
	}))
	.await;
	let (id, outcome) = harness
		.login_with(|nonce| {
			code_body(&harness.rs256_id_token(Some(nonce), RSA_A_PEM, Some("key-a")))
		})
		.await;

	assert!(outcome.logged_in && outcome.handled_auth);
	assert!(harness.record(&id).await.and_then(|record| record.tokens).is_some());

	// Only the startup fetch; a cached key needs no refetch.
	harness.jwks_mock().assert_calls_async(1).await;
}

#[tokio::test]
async fn rotated_key_is_picked_up_with_one_refetch() {
	let mut harness =
		Harness::start_with_jwks(json!({ "keys": [jwk(RSA_A_JWK, Some("key-a"))] })).await;

	harness
		.rotate_jwks(json!({
			"keys": [jwk(RSA_A_JWK, Some("key-a")), jwk(RSA_B_JWK, Some("key-b"))],
		}))
		.await;

	let (id, outcome) = harness
		.login_with(|nonce| {
			code_body(&harness.rs256_id_token(Some(nonce), RSA_B_PEM, Some("key-b")))
		})
		.await;

	assert!(outcome.logged_in && outcome.handled_auth);
	assert!(harness.record(&id).await.is_some());

	harness.jwks_mock().assert_calls_async(1).await;

	// The refreshed key set now serves later logins without another fetch.
	let (_, again) = harness
		.login_with(|nonce| {
			code_body(&harness.rs256_id_token(Some(nonce), RSA_B_PEM, Some("key-b")))
		})
		.await;

	assert!(again.logged_in);

	harness.jwks_mock().assert_calls_async(1).await;
}

#[tokio::test]
async fn unknown_kid_fails_after_one_refetch_and_drops_the_session() {
	let harness =
		Harness::start_with_jwks(json!({ "keys": [jwk(RSA_A_JWK, Some("key-a"))] })).await;
	let (id, outcome) = harness
		.login_with(|nonce| {
			code_body(&harness.rs256_id_token(Some(nonce), RSA_B_PEM, Some("key-missing")))
		})
		.await;

	assert!(!outcome.logged_in);
	assert!(!outcome.handled_auth);
	assert!(harness.record(&id).await.is_none(), "Session should be destroyed.");

	// Startup fetch plus exactly one refetch for the unknown kid.
	harness.jwks_mock().assert_calls_async(2).await;
}

#[tokio::test]
async fn token_signed_by_another_key_under_a_known_kid_is_rejected() {
	let harness =
		Harness::start_with_jwks(json!({ "keys": [jwk(RSA_A_JWK, Some("key-a"))] })).await;
	let (id, outcome) = harness
		.login_with(|nonce| {
			code_body(&harness.rs256_id_token(Some(nonce), RSA_B_PEM, Some("key-a")))
		})
		.await;

	assert!(!outcome.logged_in);
	assert!(harness.record(&id).await.is_none(), "Session should be destroyed.");
}

#[tokio::test]
async fn single_key_without_kid_is_used_for_tokens_without_kid() {
	let harness = Harness::start_with_jwks(json!({ "keys": [jwk(RSA_A_JWK, None)] })).await;
	let (id, outcome) = harness
		.login_with(|nonce| code_body(&harness.rs256_id_token(Some(nonce), RSA_A_PEM, None)))
		.await;

	assert!(outcome.logged_in && outcome.handled_auth);
	assert!(harness.record(&id).await.and_then(|record| record.tokens).is_some());

	harness.jwks_mock().assert_calls_async(1).await;
}

//! Authorization request URL and callback parameter parsing.

// self
use crate::{
	_prelude::*,
	config::ClientRegistration,
	flows::auth_code_pkce::pkce::{AttemptSecrets, CODE_CHALLENGE_METHOD},
	provider::ProviderDescriptor,
};

/// Builds the authorization endpoint URL for one attempt.
pub(crate) fn build_authorize_url(
	descriptor: &ProviderDescriptor,
	client: &ClientRegistration,
	secrets: &AttemptSecrets,
) -> Url {
	let mut url = descriptor.endpoints.authorization.clone();

	url.query_pairs_mut()
		.append_pair("response_type", "code")
		.append_pair("client_id", &client.client_id)
		.append_pair("scope", &client.scope.normalized())
		.append_pair("redirect_uri", client.redirect_uri.as_str())
		.append_pair("state", &secrets.state)
		.append_pair("nonce", &secrets.nonce)
		.append_pair("code_challenge", &secrets.pkce.challenge)
		.append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);

	url
}

/// `code` and `state` extracted from the page URL the browser landed on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct CallbackParams {
	pub(crate) code: Option<String>,
	pub(crate) state: Option<String>,
}
impl CallbackParams {
	/// Reads the first `code` and `state` query values; an unparsable URL yields neither.
	pub(crate) fn from_page_url(page_url: &str) -> Self {
		let Ok(url) = Url::parse(page_url) else {
			return Self::default();
		};
		let mut params = Self::default();

		for (key, value) in url.query_pairs() {
			match key.as_ref() {
				"code" if params.code.is_none() => params.code = Some(value.into_owned()),
				"state" if params.state.is_none() => params.state = Some(value.into_owned()),
				_ => {},
			}
		}

		params
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{ScopeSet, TokenSecret};

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse URL fixture.")
	}

	#[test]
	fn authorize_url_carries_every_parameter() {
		let descriptor = ProviderDescriptor::builder("https://idp.example.com")
			.authorization_endpoint(url("https://idp.example.com/authorize?prompt=login"))
			.token_endpoint(url("https://idp.example.com/token"))
			.build()
			.expect("Descriptor fixture should build.");
		let client = ClientRegistration {
			client_id: "client-1".into(),
			client_secret: TokenSecret::new("secret"),
			redirect_uri: url("https://app.example.com/"),
			post_logout_redirect_uri: url("https://app.example.com/"),
			scope: ScopeSet::parse_delimited("openid profile").expect("Scope fixture is valid."),
		};
		let secrets = AttemptSecrets::generate();
		let built = build_authorize_url(&descriptor, &client, &secrets);
		let pairs: HashMap<_, _> = built.query_pairs().into_owned().collect();

		assert_eq!(pairs["prompt"], "login");
		assert_eq!(pairs["response_type"], "code");
		assert_eq!(pairs["client_id"], "client-1");
		assert_eq!(pairs["scope"], "openid profile");
		assert_eq!(pairs["redirect_uri"], "https://app.example.com/");
		assert_eq!(pairs["state"], secrets.state);
		assert_eq!(pairs["nonce"], secrets.nonce);
		assert_eq!(pairs["code_challenge"], secrets.pkce.challenge);
		assert_eq!(pairs["code_challenge_method"], "S256");
		assert!(!built.as_str().contains(secrets.pkce.verifier.expose()));
	}

	#[test]
	fn callback_params_ignore_garbage() {
		assert_eq!(
			CallbackParams::from_page_url("https://app.example.com/?code=c1&state=s1&code=c2"),
			CallbackParams { code: Some("c1".into()), state: Some("s1".into()) }
		);
		assert_eq!(CallbackParams::from_page_url("not a url"), CallbackParams::default());
		assert_eq!(
			CallbackParams::from_page_url("https://app.example.com/home"),
			CallbackParams::default()
		);
	}
}

//! `oauth2-bff` binary: reads configuration, resolves the provider, and serves the BFF API.

// crates.io
use color_eyre::Result;
// self
use oauth2_bff::{config::Settings, obs, server};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	obs::init_subscriber();

	let config = Settings::load().into_config()?;

	server::serve(config).await
}

//! Provider-facing metadata.
//!
//! `descriptor` holds validated provider metadata ([`ProviderDescriptor`]) covering HTTPS-only
//! endpoints, client authentication negotiation, and PKCE support. `discovery` resolves that
//! descriptor once from the issuer's `/.well-known/openid-configuration` document.

pub mod descriptor;
pub mod discovery;

pub use descriptor::*;
pub use discovery::*;

//! Auth-domain identifiers, scope sets, token models, and ID-token verification.

pub mod id;
pub mod id_token;
pub mod scope;
pub mod token;

pub use id::*;
pub use id_token::*;
pub use scope::*;
pub use token::{secret::*, set::*};

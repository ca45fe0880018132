//! Token models shared by flows and stores.

pub mod secret;
pub mod set;

//! Observability helpers for controller operations.
//!
//! Every operation runs inside an `oauth2_bff.flow` span carrying the `flow` (operation) and
//! `stage` (call site) fields. With the `metrics` feature enabled, each attempt, success, and
//! failure also increments the `oauth2_bff_flow_total` counter labeled by `flow` + `outcome`, and
//! sessions dropped after a provider failure increment `oauth2_bff_session_dropped_total`.
//! [`init_subscriber`] installs the process-wide `tracing-subscriber` used by the binary.

mod metrics;
mod span;

pub use metrics::*;
pub use span::*;

// crates.io
use tracing_subscriber::{EnvFilter, fmt};
// self
use crate::_prelude::*;

/// Operations of the flow controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// `start`: mint a login attempt and authorization URL.
	Start,
	/// `pageload`: consume a callback and exchange the code.
	PageLoad,
	/// `userinfo`: read cached claims.
	Userinfo,
	/// `refresh`: redeem the refresh token.
	Refresh,
	/// `logout`: drop the session and build the end-session URL.
	Logout,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Start => "start",
			FlowKind::PageLoad => "pageload",
			FlowKind::Userinfo => "userinfo",
			FlowKind::Refresh => "refresh",
			FlowKind::Logout => "logout",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a controller operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller, or an upstream failure that ended the session.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Installs the global fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Calling it twice is harmless; the second installation is ignored.
pub fn init_subscriber() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

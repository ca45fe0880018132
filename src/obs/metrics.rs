// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counts one controller outcome as `oauth2_bff_flow_total{flow, outcome}`.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"oauth2_bff_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Counts a session destroyed because the provider rejected or failed a grant, as
/// `oauth2_bff_session_dropped_total{flow}`.
pub fn record_session_dropped(kind: FlowKind) {
	#[cfg(feature = "metrics")]
	metrics::counter!("oauth2_bff_session_dropped_total", "flow" => kind.as_str()).increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = kind;
}

// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_ACTIVE: &str = "ws.active";
pub const QUESTION_SUBMITTED: &str = "qa.question.submitted";
pub const TRANSITION_COMMITTED: &str = "qa.transition.committed";
pub const TRANSITION_REJECTED: &str = "qa.transition.rejected";
pub const TRANSITION_STALE: &str = "qa.transition.stale";
pub const FANOUT_PUBLISHED: &str = "qa.fanout.published";
pub const FANOUT_LAGGED: &str = "qa.fanout.lagged";
pub const POLL_FALLBACK_ENGAGED: &str = "qa.poll_fallback.engaged";
pub const SESSION_CREATED: &str = "qa.session.created";
pub const SESSION_ACTIVE: &str = "qa.session.active";
pub const SESSION_EXPIRED: &str = "qa.session.expired";
pub const GATE_TOGGLED: &str = "qa.gate.toggled";
pub const HANDOFF_ISSUED: &str = "qa.handoff.issued";
pub const HANDOFF_CLAIMED: &str = "qa.handoff.claimed";
pub const HANDOFF_ABANDONED: &str = "qa.handoff.abandoned";

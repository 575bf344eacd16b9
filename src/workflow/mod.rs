//! Permit workflow domain logic
//!
//! The status taxonomy, SLA/expiry classification, and dashboard aggregation
//! shared by every route. All functions here are pure: callers inject `now`
//! so behavior is a function of inputs only.

pub mod sla;
pub mod status;
pub mod summary;

pub use sla::{permit_status, review_sla, DEFAULT_LOOKAHEAD_DAYS};
pub use status::{ApplicationStatus, BadgeTone, InspectionOutcome, PermitStatus, SlaStatus, StatusBadge};
pub use summary::{summarize, summarize_permits, ApplicationFacts, DashboardSummary, PermitSummary};

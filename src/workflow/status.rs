//! Status taxonomy and badge mapping
//!
//! One shared module for every status enum the portal displays, replacing
//! per-view copies of the same mapping. Badge lookup is total: any code
//! string resolves to a badge, unknown codes to an "Unknown" badge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Application lifecycle status
///
/// Transitions are monotonic along the fixed lifecycle; `Cancelled` is
/// reachable from any pre-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    PendingInspection,
    Approved,
    Rejected,
    RevisionRequired,
    Cancelled,
}

impl ApplicationStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Draft,
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::PendingInspection,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::RevisionRequired,
        ApplicationStatus::Cancelled,
    ];

    /// Wire/storage code for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::PendingInspection => "pending_inspection",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::RevisionRequired => "revision_required",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transitions are allowed from this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }

    /// Validate a lifecycle transition
    ///
    /// Forward-only: draft -> submitted -> under_review -> pending_inspection
    /// -> approved | rejected | revision_required. Revision loops back into
    /// review once resubmitted. Cancel is allowed from any pre-terminal state.
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        if *self == next {
            return false;
        }
        if next == Self::Cancelled {
            return !self.is_terminal();
        }
        match self {
            Self::Draft => matches!(next, Self::Submitted),
            Self::Submitted => matches!(next, Self::UnderReview),
            Self::UnderReview => {
                matches!(next, Self::PendingInspection | Self::Approved | Self::Rejected | Self::RevisionRequired)
            }
            Self::PendingInspection => {
                matches!(next, Self::Approved | Self::Rejected | Self::RevisionRequired)
            }
            Self::RevisionRequired => matches!(next, Self::Submitted),
            Self::Approved | Self::Rejected | Self::Cancelled => false,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "under_review" => Ok(Self::UnderReview),
            "pending_inspection" => Ok(Self::PendingInspection),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "revision_required" => Ok(Self::RevisionRequired),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown application status: {other}")),
        }
    }
}

/// Derived permit status, computed from expiry date against now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitStatus {
    Active,
    ExpiringSoon,
    Expired,
}

impl PermitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ExpiringSoon => "expiring_soon",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inspection compliance outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionOutcome {
    Compliant,
    MinorIssues,
    MajorViolations,
}

impl InspectionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::MinorIssues => "minor_issues",
            Self::MajorViolations => "major_violations",
        }
    }
}

impl fmt::Display for InspectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Review deadline classification for an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    OnTime,
    Overdue,
}

impl SlaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTime => "on_time",
            Self::Overdue => "overdue",
        }
    }
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Visual category for a status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Neutral,
    Info,
    Warning,
    Success,
    Danger,
}

/// Display label and tone for a status code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: &'static str,
    pub tone: BadgeTone,
}

impl StatusBadge {
    const fn new(label: &'static str, tone: BadgeTone) -> Self {
        Self { label, tone }
    }

    /// Fallback badge for codes outside the taxonomy. Never panics.
    pub const UNKNOWN: StatusBadge = StatusBadge::new("Unknown", BadgeTone::Neutral);

    /// Badge for any status code string, application, permit or inspection.
    pub fn for_code(code: &str) -> StatusBadge {
        match code {
            "draft" => Self::new("Draft", BadgeTone::Neutral),
            "submitted" => Self::new("Submitted", BadgeTone::Info),
            "under_review" => Self::new("Under Review", BadgeTone::Info),
            "pending_inspection" => Self::new("Pending Inspection", BadgeTone::Warning),
            "approved" => Self::new("Approved", BadgeTone::Success),
            "rejected" => Self::new("Rejected", BadgeTone::Danger),
            "revision_required" => Self::new("Revision Required", BadgeTone::Warning),
            "cancelled" => Self::new("Cancelled", BadgeTone::Neutral),
            "active" => Self::new("Active", BadgeTone::Success),
            "expiring_soon" => Self::new("Expiring Soon", BadgeTone::Warning),
            "expired" => Self::new("Expired", BadgeTone::Danger),
            "compliant" => Self::new("Compliant", BadgeTone::Success),
            "minor_issues" => Self::new("Minor Issues", BadgeTone::Warning),
            "major_violations" => Self::new("Major Violations", BadgeTone::Danger),
            "on_time" => Self::new("On Time", BadgeTone::Success),
            "overdue" => Self::new("Overdue", BadgeTone::Danger),
            _ => Self::UNKNOWN,
        }
    }
}

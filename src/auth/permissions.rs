//! Portal roles and operation authorization
//!
//! One table maps every API operation to the roles allowed to perform it.
//! Unknown operations are blocked.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Portal roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Citizen applying for a permit
    #[default]
    Applicant,
    /// Staff reviewing submitted applications
    Reviewer,
    /// Field staff recording inspections
    Inspector,
    /// Staff issuing the final decision and permits
    Approver,
    /// Full administrative access
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applicant => "applicant",
            Self::Reviewer => "reviewer",
            Self::Inspector => "inspector",
            Self::Approver => "approver",
            Self::Admin => "admin",
        }
    }

    /// Staff roles see all records; applicants only their own
    pub fn is_staff(&self) -> bool {
        !matches!(self, Self::Applicant)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applicant" => Ok(Self::Applicant),
            "reviewer" => Ok(Self::Reviewer),
            "inspector" => Ok(Self::Inspector),
            "approver" => Ok(Self::Approver),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Roles allowed to perform an operation. None for unknown operations,
/// which are blocked.
fn allowed_roles(operation: &str) -> Option<&'static [Role]> {
    use Role::*;

    const ALL: &[Role] = &[Applicant, Reviewer, Inspector, Approver, Admin];
    const STAFF: &[Role] = &[Reviewer, Inspector, Approver, Admin];
    const DECIDERS: &[Role] = &[Reviewer, Approver, Admin];

    match operation {
        // Applicant-facing
        "application_create" | "application_submit" | "application_cancel" => {
            Some(&[Applicant, Admin])
        }
        // Any signed-in user; applicants are scoped to their own records
        "application_list" | "application_get" | "permit_list" | "permit_get"
        | "certificate_download" => Some(ALL),

        // Review workflow
        "application_update" => Some(&[Applicant, Reviewer, Admin]),
        "application_assign" => Some(DECIDERS),
        "application_decide" => Some(DECIDERS),
        "application_delete" => Some(&[Admin]),

        // Inspections
        "inspection_list" | "inspection_get" => Some(STAFF),
        "inspection_create" => Some(&[Inspector, Admin]),

        // Permits
        "permit_issue" => Some(&[Approver, Admin]),

        // Dashboards
        "dashboard_summary" => Some(STAFF),
        "user_admin" => Some(&[Admin]),

        // Unknown operations are blocked
        _ => None,
    }
}

/// Check if an operation is allowed for the given role
pub fn is_operation_allowed(operation: &str, role: Role) -> bool {
    match allowed_roles(operation) {
        Some(roles) => roles.contains(&role),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applicant_operations() {
        assert!(is_operation_allowed("application_create", Role::Applicant));
        assert!(is_operation_allowed("application_submit", Role::Applicant));
        assert!(!is_operation_allowed("application_create", Role::Reviewer));
    }

    #[test]
    fn test_staff_operations() {
        assert!(is_operation_allowed("application_decide", Role::Reviewer));
        assert!(is_operation_allowed("application_decide", Role::Approver));
        assert!(!is_operation_allowed("application_decide", Role::Applicant));
        assert!(!is_operation_allowed("application_decide", Role::Inspector));
    }

    #[test]
    fn test_inspector_operations() {
        assert!(is_operation_allowed("inspection_create", Role::Inspector));
        assert!(!is_operation_allowed("inspection_create", Role::Reviewer));
        assert!(!is_operation_allowed("inspection_create", Role::Applicant));
    }

    #[test]
    fn test_permit_issuance_restricted_to_approvers() {
        assert!(is_operation_allowed("permit_issue", Role::Approver));
        assert!(is_operation_allowed("permit_issue", Role::Admin));
        assert!(!is_operation_allowed("permit_issue", Role::Reviewer));
    }

    #[test]
    fn test_unknown_operations_blocked() {
        assert!(!is_operation_allowed("unknown_operation", Role::Admin));
        assert!(!is_operation_allowed("drop_all_tables", Role::Admin));
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Applicant, Role::Reviewer, Role::Inspector, Role::Approver, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}

//! SLA and expiry classification
//!
//! Pure functions of their inputs. `now` is always injected by the caller;
//! nothing here reads the clock.

use chrono::{DateTime, Duration, Utc};

use super::status::{PermitStatus, SlaStatus};

/// Days before expiry during which a permit counts as expiring soon
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 30;

/// Classify a permit relative to its expiry date.
///
/// Expired iff `expiry_date < now` (strict). Otherwise expiring soon iff
/// `expiry_date <= now + lookahead_days`. Otherwise active. The two checks
/// are mutually exclusive in that order, so `expiry_date == now` classifies
/// as expiring soon.
pub fn permit_status(
    now: DateTime<Utc>,
    expiry_date: DateTime<Utc>,
    lookahead_days: i64,
) -> PermitStatus {
    if expiry_date < now {
        PermitStatus::Expired
    } else if expiry_date <= now + Duration::days(lookahead_days) {
        PermitStatus::ExpiringSoon
    } else {
        PermitStatus::Active
    }
}

/// Classify an application against its review deadline.
///
/// Overdue once the deadline has passed; an application with no deadline yet
/// (pre-submission) is on time.
pub fn review_sla(now: DateTime<Utc>, deadline: Option<DateTime<Utc>>) -> SlaStatus {
    match deadline {
        Some(deadline) if deadline < now => SlaStatus::Overdue,
        _ => SlaStatus::OnTime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_expired_regardless_of_lookahead() {
        let now = at(2024, 7, 1);
        let expiry = at(2024, 6, 25);
        for lookahead in [0, 1, 30, 365] {
            assert_eq!(permit_status(now, expiry, lookahead), PermitStatus::Expired);
        }
    }

    #[test]
    fn test_expiring_soon_within_window() {
        let now = at(2024, 6, 1);
        assert_eq!(
            permit_status(now, now, DEFAULT_LOOKAHEAD_DAYS),
            PermitStatus::ExpiringSoon
        );
        assert_eq!(
            permit_status(now, at(2024, 6, 15), DEFAULT_LOOKAHEAD_DAYS),
            PermitStatus::ExpiringSoon
        );
        // Exactly on the window boundary
        assert_eq!(
            permit_status(now, at(2024, 7, 1), DEFAULT_LOOKAHEAD_DAYS),
            PermitStatus::ExpiringSoon
        );
    }

    #[test]
    fn test_active_beyond_window() {
        let now = at(2024, 6, 1);
        assert_eq!(
            permit_status(now, at(2024, 7, 2), DEFAULT_LOOKAHEAD_DAYS),
            PermitStatus::Active
        );
        assert_eq!(
            permit_status(now, at(2026, 1, 1), DEFAULT_LOOKAHEAD_DAYS),
            PermitStatus::Active
        );
    }

    #[test]
    fn test_worked_example_permit() {
        // Permit issued 2024-01-01, expiring 2024-06-25
        let expiry = at(2024, 6, 25);
        assert_eq!(
            permit_status(at(2024, 6, 20), expiry, DEFAULT_LOOKAHEAD_DAYS),
            PermitStatus::ExpiringSoon
        );
        assert_eq!(
            permit_status(at(2024, 7, 1), expiry, DEFAULT_LOOKAHEAD_DAYS),
            PermitStatus::Expired
        );
    }

    #[test]
    fn test_review_sla() {
        let now = at(2024, 6, 1);
        assert_eq!(review_sla(now, Some(at(2024, 6, 2))), SlaStatus::OnTime);
        assert_eq!(review_sla(now, Some(now)), SlaStatus::OnTime);
        assert_eq!(review_sla(now, Some(at(2024, 5, 31))), SlaStatus::Overdue);
        assert_eq!(review_sla(now, None), SlaStatus::OnTime);
    }
}

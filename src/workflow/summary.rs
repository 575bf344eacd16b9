//! Dashboard aggregation
//!
//! Reduces record collections into the counts the dashboards display.
//! Aggregation is order-independent and never mutates its input; the
//! approval rate is defined as 0 when nothing has been decided yet so no
//! NaN can leak into a response.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::sla::permit_status;
use super::status::{ApplicationStatus, PermitStatus};

/// The slice of an application record the aggregates need
#[derive(Debug, Clone)]
pub struct ApplicationFacts {
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub assigned_reviewer: Option<String>,
}

/// Aggregate view over a collection of applications
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    /// Total number of applications
    pub total: usize,
    /// Count per status code
    pub by_status: HashMap<&'static str, usize>,
    /// Applications created in the current calendar month
    pub created_this_month: usize,
    /// approved / (approved + rejected); 0 when nothing has been decided
    pub approval_rate: f64,
    /// Open queue depth per assigned reviewer
    pub reviewer_queue: HashMap<String, usize>,
}

/// Reduce a collection of applications into dashboard counts.
pub fn summarize(apps: &[ApplicationFacts], now: DateTime<Utc>) -> DashboardSummary {
    let mut by_status: HashMap<&'static str, usize> = HashMap::new();
    for status in ApplicationStatus::ALL {
        by_status.insert(status.as_str(), 0);
    }

    let mut created_this_month = 0;
    let mut approved = 0usize;
    let mut rejected = 0usize;
    let mut reviewer_queue: HashMap<String, usize> = HashMap::new();

    for app in apps {
        *by_status.entry(app.status.as_str()).or_insert(0) += 1;

        if app.created_at.year() == now.year() && app.created_at.month() == now.month() {
            created_this_month += 1;
        }

        match app.status {
            ApplicationStatus::Approved => approved += 1,
            ApplicationStatus::Rejected => rejected += 1,
            _ => {}
        }

        // Open work only: terminal applications leave the reviewer's queue
        if !app.status.is_terminal() {
            if let Some(reviewer) = &app.assigned_reviewer {
                *reviewer_queue.entry(reviewer.clone()).or_insert(0) += 1;
            }
        }
    }

    let decided = approved + rejected;
    let approval_rate = if decided == 0 {
        0.0
    } else {
        approved as f64 / decided as f64
    };

    DashboardSummary {
        total: apps.len(),
        by_status,
        created_this_month,
        approval_rate,
        reviewer_queue,
    }
}

/// Aggregate view over a collection of permits
#[derive(Debug, Clone, Serialize)]
pub struct PermitSummary {
    pub total: usize,
    pub active: usize,
    pub expiring_soon: usize,
    pub expired: usize,
}

/// Classify each permit expiry against `now` and count the buckets.
pub fn summarize_permits(
    expiry_dates: &[DateTime<Utc>],
    now: DateTime<Utc>,
    lookahead_days: i64,
) -> PermitSummary {
    let mut summary = PermitSummary {
        total: expiry_dates.len(),
        active: 0,
        expiring_soon: 0,
        expired: 0,
    };

    for expiry in expiry_dates {
        match permit_status(now, *expiry, lookahead_days) {
            PermitStatus::Active => summary.active += 1,
            PermitStatus::ExpiringSoon => summary.expiring_soon += 1,
            PermitStatus::Expired => summary.expired += 1,
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn app(status: ApplicationStatus, created: DateTime<Utc>) -> ApplicationFacts {
        ApplicationFacts {
            status,
            created_at: created,
            assigned_reviewer: None,
        }
    }

    #[test]
    fn test_empty_collection() {
        let summary = summarize(&[], at(2024, 6, 1));
        assert_eq!(summary.total, 0);
        assert_eq!(summary.created_this_month, 0);
        assert_eq!(summary.approval_rate, 0.0);
        assert!(summary.approval_rate.is_finite());
        for status in ApplicationStatus::ALL {
            assert_eq!(summary.by_status[status.as_str()], 0);
        }
    }

    #[test]
    fn test_approval_rate_two_thirds() {
        let now = at(2024, 6, 15);
        let apps = vec![
            app(ApplicationStatus::Approved, at(2024, 5, 1)),
            app(ApplicationStatus::Approved, at(2024, 5, 2)),
            app(ApplicationStatus::Rejected, at(2024, 5, 3)),
        ];
        let summary = summarize(&apps, now);
        assert_eq!(summary.total, 3);
        assert!((summary.approval_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_permutation_invariance() {
        let now = at(2024, 6, 15);
        let apps = vec![
            app(ApplicationStatus::Draft, at(2024, 6, 1)),
            app(ApplicationStatus::Submitted, at(2024, 6, 2)),
            app(ApplicationStatus::Approved, at(2024, 5, 20)),
            app(ApplicationStatus::Rejected, at(2024, 4, 10)),
            app(ApplicationStatus::UnderReview, at(2024, 6, 14)),
        ];

        let baseline = summarize(&apps, now);

        // Exercise several distinct orderings by rotation and reversal
        for rotation in 0..apps.len() {
            let mut shuffled = apps.clone();
            shuffled.rotate_left(rotation);
            let summary = summarize(&shuffled, now);
            assert_eq!(summary.total, baseline.total);
            assert_eq!(summary.by_status, baseline.by_status);
            assert_eq!(summary.created_this_month, baseline.created_this_month);
            assert_eq!(summary.approval_rate, baseline.approval_rate);

            shuffled.reverse();
            let summary = summarize(&shuffled, now);
            assert_eq!(summary.by_status, baseline.by_status);
            assert_eq!(summary.created_this_month, baseline.created_this_month);
        }
    }

    #[test]
    fn test_created_this_month_matches_month_and_year() {
        let now = at(2024, 6, 15);
        let apps = vec![
            app(ApplicationStatus::Draft, at(2024, 6, 1)),
            app(ApplicationStatus::Draft, at(2024, 6, 30)),
            // Same month last year does not count
            app(ApplicationStatus::Draft, at(2023, 6, 15)),
            app(ApplicationStatus::Draft, at(2024, 5, 31)),
        ];
        assert_eq!(summarize(&apps, now).created_this_month, 2);
    }

    #[test]
    fn test_reviewer_queue_counts_open_work_only() {
        let now = at(2024, 6, 15);
        let mut apps = vec![
            app(ApplicationStatus::UnderReview, at(2024, 6, 1)),
            app(ApplicationStatus::PendingInspection, at(2024, 6, 2)),
            app(ApplicationStatus::Approved, at(2024, 6, 3)),
        ];
        for a in &mut apps {
            a.assigned_reviewer = Some("rev-1".to_string());
        }
        let summary = summarize(&apps, now);
        assert_eq!(summary.reviewer_queue["rev-1"], 2);
    }

    #[test]
    fn test_input_not_mutated() {
        let apps = vec![app(ApplicationStatus::Draft, at(2024, 6, 1))];
        let before = apps.clone();
        let _ = summarize(&apps, at(2024, 6, 15));
        assert_eq!(apps.len(), before.len());
        assert_eq!(apps[0].status, before[0].status);
    }

    #[test]
    fn test_permit_summary_buckets() {
        let now = at(2024, 6, 1);
        let expiries = vec![
            at(2024, 5, 1),  // expired
            at(2024, 6, 10), // expiring soon
            at(2024, 6, 1),  // boundary: expiring soon
            at(2024, 9, 1),  // active
        ];
        let summary = summarize_permits(&expiries, now, 30);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.expired, 1);
        assert_eq!(summary.expiring_soon, 2);
        assert_eq!(summary.active, 1);
    }
}

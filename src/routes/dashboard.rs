//! Staff dashboard aggregates
//!
//! GET /api/dashboard/summary - one round trip for the review dashboard:
//! application counts per status, month-to-date intake, approval rate,
//! reviewer queue depths and permit expiry buckets.

use chrono::Utc;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::{error_response, json_response, require_operation, stores, BoxBody};
use crate::server::AppState;
use crate::store::{ApplicationFilter, PermitFilter};
use crate::types::Result;
use crate::workflow::{summarize, summarize_permits, ApplicationFacts, DashboardSummary, PermitSummary};

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub applications: DashboardSummary,
    pub permits: PermitSummary,
}

/// GET /api/dashboard/summary
pub async fn handle_dashboard_summary(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    if let Err(e) = require_operation(&req, &state, "dashboard_summary") {
        return error_response(e);
    }

    match summary(&state).await {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => error_response(e),
    }
}

async fn summary(state: &AppState) -> Result<DashboardResponse> {
    let stores = stores(state)?;
    let now = Utc::now();

    let applications = stores.applications.list(&ApplicationFilter::default()).await?;
    let facts: Vec<ApplicationFacts> = applications
        .iter()
        .map(|app| ApplicationFacts {
            status: app.status,
            created_at: app
                .metadata
                .created_at
                .map(|d| d.to_chrono())
                .unwrap_or(now),
            assigned_reviewer: app.assigned_reviewer.clone(),
        })
        .collect();

    let permits = stores.permits.list(&PermitFilter::default()).await?;
    let expiry_dates: Vec<_> = permits.iter().map(|p| p.expiry_date.to_chrono()).collect();

    Ok(DashboardResponse {
        applications: summarize(&facts, now),
        permits: summarize_permits(&expiry_dates, now, state.args.permit_lookahead_days),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ApplicationStatus;

    // The handler builds its input through the workflow re-exports
    #[test]
    fn test_facts_feed_summarize_via_reexports() {
        let now = Utc::now();
        let facts = vec![ApplicationFacts {
            status: ApplicationStatus::Approved,
            created_at: now,
            assigned_reviewer: None,
        }];
        let summary = summarize(&facts, now);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.approval_rate, 1.0);
    }
}

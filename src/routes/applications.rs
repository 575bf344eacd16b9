//! HTTP routes for permit applications
//!
//! - GET    /api/applications              - List (filterable via query params)
//! - POST   /api/applications              - Create a draft
//! - GET    /api/applications/{id}         - Fetch one
//! - PUT    /api/applications/{id}         - Edit fields while still editable
//! - DELETE /api/applications/{id}         - Soft-delete (admin)
//! - POST   /api/applications/{id}/status  - Lifecycle transition
//! - POST   /api/applications/{id}/assign  - Assign reviewer/inspector
//!
//! Applicants are scoped to their own records; staff see everything.

use chrono::{DateTime, Utc};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::{
    cors_preflight, error_response, json_response, not_found, parse_csv, parse_json_body,
    require_operation, stores, BoxBody, SuccessResponse,
};
use crate::auth::Claims;
use crate::db::schemas::{ApplicationDoc, ApplicationType, LocationRef};
use crate::server::AppState;
use crate::store::{ApplicationFilter, ApplicationPatch, NewApplication, StatusChange};
use crate::types::{Result, SluiceError};
use crate::workflow::{ApplicationStatus, StatusBadge};

// =============================================================================
// Request/Response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub application_type: ApplicationType,
    pub water_source: String,
    pub water_purpose: String,
    pub location: LocationRef,
    pub project_title: String,
    #[serde(default)]
    pub project_description: Option<String>,
    pub usage_volume: f64,
    pub usage_unit: String,
    #[serde(default)]
    pub project_value: f64,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateApplicationRequest {
    pub water_source: Option<String>,
    pub water_purpose: Option<String>,
    pub project_title: Option<String>,
    pub project_description: Option<String>,
    pub usage_volume: Option<f64>,
    pub usage_unit: Option<String>,
    pub project_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub reviewer: Option<String>,
    #[serde(default)]
    pub inspector: Option<String>,
}

/// Comma-separated multi-value filters, matching the list query params
#[derive(Debug, Deserialize, Default)]
struct ListQuery {
    status: Option<String>,
    #[serde(rename = "type")]
    application_type: Option<String>,
    province: Option<String>,
    water_source: Option<String>,
    reviewer: Option<String>,
    inspector: Option<String>,
    applicant: Option<String>,
    created_after: Option<String>,
    created_before: Option<String>,
}

/// Wire shape of an application record
#[derive(Debug, Serialize)]
pub struct ApplicationView {
    pub id: String,
    pub application_number: String,
    pub applicant_id: String,
    pub application_type: String,
    pub water_source: String,
    pub water_purpose: String,
    pub location: LocationRef,
    pub project_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_description: Option<String>,
    pub usage_volume: f64,
    pub usage_unit: String,
    pub project_value: f64,
    pub status: String,
    pub status_badge: StatusBadge,
    pub sla_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_reviewer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_inspector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn rfc3339(date: Option<bson::DateTime>) -> Option<String> {
    date.map(|d| d.to_chrono().to_rfc3339())
}

impl From<&ApplicationDoc> for ApplicationView {
    fn from(app: &ApplicationDoc) -> Self {
        Self {
            id: app._id.map(|id| id.to_hex()).unwrap_or_default(),
            application_number: app.application_number.clone(),
            applicant_id: app.applicant_id.clone(),
            application_type: app.application_type.as_str().to_string(),
            water_source: app.water_source.clone(),
            water_purpose: app.water_purpose.clone(),
            location: app.location.clone(),
            project_title: app.project_title.clone(),
            project_description: app.project_description.clone(),
            usage_volume: app.usage_volume,
            usage_unit: app.usage_unit.clone(),
            project_value: app.project_value,
            status: app.status.as_str().to_string(),
            status_badge: StatusBadge::for_code(app.status.as_str()),
            sla_status: app.sla_status.as_str().to_string(),
            review_deadline: rfc3339(app.review_deadline),
            submitted_at: rfc3339(app.submitted_at),
            reviewed_at: rfc3339(app.reviewed_at),
            approved_at: rfc3339(app.approved_at),
            assigned_reviewer: app.assigned_reviewer.clone(),
            assigned_inspector: app.assigned_inspector.clone(),
            rejection_reason: app.rejection_reason.clone(),
            created_at: rfc3339(app.metadata.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplicationListResponse {
    pub applications: Vec<ApplicationView>,
    pub total: usize,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Route /api/applications* requests
pub async fn handle_application_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<BoxBody> {
    let method = req.method().clone();

    if method == Method::OPTIONS {
        return cors_preflight();
    }

    let rest = path.strip_prefix("/api/applications").unwrap_or("");
    match (method, rest) {
        (Method::GET, "") => handle_list(req, state).await,
        (Method::POST, "") => handle_create(req, state).await,
        (Method::GET, rest) => match parse_id(rest) {
            Some(id) => handle_get(req, state, &id).await,
            None => not_found(path),
        },
        (Method::PUT, rest) => match parse_id(rest) {
            Some(id) => handle_update(req, state, &id).await,
            None => not_found(path),
        },
        (Method::DELETE, rest) => match parse_id(rest) {
            Some(id) => handle_delete(req, state, &id).await,
            None => not_found(path),
        },
        (Method::POST, rest) => match rest.strip_suffix("/status").and_then(parse_id) {
            Some(id) => handle_status_change(req, state, &id).await,
            None => match rest.strip_suffix("/assign").and_then(parse_id) {
                Some(id) => handle_assign(req, state, &id).await,
                None => not_found(path),
            },
        },
        _ => not_found(path),
    }
}

/// "/abc123" -> Some("abc123"), anything with more segments -> None
fn parse_id(rest: &str) -> Option<String> {
    let id = rest.strip_prefix('/')?;
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some(id.to_string())
}

// =============================================================================
// Handlers
// =============================================================================

async fn handle_list(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match require_operation(&req, &state, "application_list") {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    let query = req.uri().query().unwrap_or("");
    let result = list(&state, &claims, query).await;
    match result {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => error_response(e),
    }
}

async fn list(state: &AppState, claims: &Claims, query: &str) -> Result<ApplicationListResponse> {
    let params: ListQuery = serde_urlencoded::from_str(query)
        .map_err(|e| SluiceError::BadRequest(format!("Invalid query: {}", e)))?;
    let filter = scoped_filter(&params, claims)?;

    let applications = stores(state)?.applications.list(&filter).await?;
    let views: Vec<ApplicationView> = applications.iter().map(ApplicationView::from).collect();
    Ok(ApplicationListResponse {
        total: views.len(),
        applications: views,
    })
}

/// Build the list filter; applicants are pinned to their own records
/// whatever the query asked for.
fn scoped_filter(params: &ListQuery, claims: &Claims) -> Result<ApplicationFilter> {
    let mut filter = build_filter(params)?;
    if !claims.role.is_staff() {
        filter.applicant_id = Some(claims.user_id.clone());
    }
    Ok(filter)
}

fn build_filter(params: &ListQuery) -> Result<ApplicationFilter> {
    let mut filter = ApplicationFilter::default();

    if let Some(status) = &params.status {
        filter.statuses = parse_csv::<ApplicationStatus>(status)?;
    }
    if let Some(ty) = &params.application_type {
        filter.types = parse_csv::<ApplicationType>(ty)?;
    }
    if let Some(province) = &params.province {
        filter.provinces = province.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Some(source) = &params.water_source {
        filter.water_sources = source.split(',').map(|s| s.trim().to_string()).collect();
    }
    filter.assigned_reviewer = params.reviewer.clone();
    filter.assigned_inspector = params.inspector.clone();
    filter.applicant_id = params.applicant.clone();
    filter.created_after = parse_date(params.created_after.as_deref())?;
    filter.created_before = parse_date(params.created_before.as_deref())?;

    Ok(filter)
}

fn parse_date(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|e| SluiceError::BadRequest(format!("Invalid date '{}': {}", value, e))),
    }
}

async fn handle_create(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match require_operation(&req, &state, "application_create") {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };
    let body: CreateApplicationRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let new = NewApplication {
        applicant_id: claims.user_id.clone(),
        application_type: body.application_type,
        water_source: body.water_source,
        water_purpose: body.water_purpose,
        location: body.location,
        project_title: body.project_title,
        project_description: body.project_description,
        usage_volume: body.usage_volume,
        usage_unit: body.usage_unit,
        project_value: body.project_value,
    };

    let result = async {
        let created = stores(&state)?.applications.create(new).await?;
        info!(
            "Application {} created by {}",
            created.application_number, claims.identifier
        );
        Ok::<_, SluiceError>(ApplicationView::from(&created))
    }
    .await;

    match result {
        Ok(view) => json_response(StatusCode::CREATED, &view),
        Err(e) => error_response(e),
    }
}

async fn handle_get(req: Request<Incoming>, state: Arc<AppState>, id: &str) -> Response<BoxBody> {
    let claims = match require_operation(&req, &state, "application_get") {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    match fetch_scoped(&state, &claims, id).await {
        Ok(app) => json_response(StatusCode::OK, &ApplicationView::from(&app)),
        Err(e) => error_response(e),
    }
}

/// Fetch one application, enforcing applicant ownership
async fn fetch_scoped(state: &AppState, claims: &Claims, id: &str) -> Result<ApplicationDoc> {
    let app = stores(state)?.applications.get(id).await?;
    if !claims.role.is_staff() && app.applicant_id != claims.user_id {
        // Not-found rather than forbidden: don't leak other citizens' records
        return Err(SluiceError::NotFound(format!("application {id}")));
    }
    Ok(app)
}

async fn handle_update(req: Request<Incoming>, state: Arc<AppState>, id: &str) -> Response<BoxBody> {
    let claims = match require_operation(&req, &state, "application_update") {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };
    let body: UpdateApplicationRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let result = update(&state, &claims, id, body).await;
    match result {
        Ok(view) => json_response(StatusCode::OK, &view),
        Err(e) => error_response(e),
    }
}

async fn update(
    state: &AppState,
    claims: &Claims,
    id: &str,
    body: UpdateApplicationRequest,
) -> Result<ApplicationView> {
    let app = fetch_scoped(state, claims, id).await?;

    // Applicants may only edit before review starts
    if !claims.role.is_staff()
        && !matches!(
            app.status,
            ApplicationStatus::Draft | ApplicationStatus::RevisionRequired
        )
    {
        return Err(SluiceError::Validation(format!(
            "application in status {} is no longer editable",
            app.status
        )));
    }

    let patch = ApplicationPatch {
        water_source: body.water_source,
        water_purpose: body.water_purpose,
        project_title: body.project_title,
        project_description: body.project_description,
        usage_volume: body.usage_volume,
        usage_unit: body.usage_unit,
        project_value: body.project_value,
        ..Default::default()
    };

    let updated = stores(state)?.applications.update(id, patch).await?;
    Ok(ApplicationView::from(&updated))
}

async fn handle_status_change(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let result = status_change(req, &state, id).await;
    match result {
        Ok(view) => json_response(StatusCode::OK, &view),
        Err(e) => error_response(e),
    }
}

async fn status_change(
    req: Request<Incoming>,
    state: &AppState,
    id: &str,
) -> Result<ApplicationView> {
    let claims = super::authenticate(&req, state)?;
    let body: StatusChangeRequest = parse_json_body(req).await?;

    let next: ApplicationStatus = body
        .status
        .parse()
        .map_err(SluiceError::BadRequest)?;

    let operation = match next {
        ApplicationStatus::Submitted => "application_submit",
        ApplicationStatus::Cancelled => "application_cancel",
        _ => "application_decide",
    };
    if !crate::auth::is_operation_allowed(operation, claims.role) {
        return Err(SluiceError::Forbidden(format!(
            "Role {} may not perform {}",
            claims.role, operation
        )));
    }

    // Ownership check for applicant-driven transitions
    fetch_scoped(state, &claims, id).await?;

    let updated = stores(state)?
        .applications
        .update_status(
            id,
            StatusChange {
                next,
                reason: body.reason,
                now: Utc::now(),
            },
        )
        .await?;

    info!(
        "Application {} moved to {} by {}",
        updated.application_number, updated.status, claims.identifier
    );
    Ok(ApplicationView::from(&updated))
}

async fn handle_assign(req: Request<Incoming>, state: Arc<AppState>, id: &str) -> Response<BoxBody> {
    let claims = match require_operation(&req, &state, "application_assign") {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };
    let body: AssignRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    if body.reviewer.is_none() && body.inspector.is_none() {
        return error_response(SluiceError::Validation(
            "assign requires a reviewer or an inspector".into(),
        ));
    }

    let patch = ApplicationPatch {
        assigned_reviewer: body.reviewer,
        assigned_inspector: body.inspector,
        ..Default::default()
    };

    let result = async {
        let updated = stores(&state)?.applications.update(id, patch).await?;
        info!(
            "Application {} assignment updated by {}",
            updated.application_number, claims.identifier
        );
        Ok::<_, SluiceError>(ApplicationView::from(&updated))
    }
    .await;

    match result {
        Ok(view) => json_response(StatusCode::OK, &view),
        Err(e) => error_response(e),
    }
}

async fn handle_delete(req: Request<Incoming>, state: Arc<AppState>, id: &str) -> Response<BoxBody> {
    let claims = match require_operation(&req, &state, "application_delete") {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    let result = async {
        stores(&state)?.applications.remove(id).await?;
        info!("Application {} deleted by {}", id, claims.identifier);
        Ok::<_, SluiceError>(())
    }
    .await;

    match result {
        Ok(()) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: "Application deleted".into(),
            },
        ),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::store::memory::InMemoryApplications;
    use crate::store::ApplicationRecords;

    fn claims_for(user_id: &str, role: Role) -> Claims {
        Claims {
            user_id: user_id.into(),
            identifier: format!("{user_id}@example.rw"),
            role,
            verified: true,
            version: 0,
            iat: 0,
            exp: u64::MAX,
        }
    }

    #[tokio::test]
    async fn test_applicant_list_scoped_to_own_records() {
        let store = InMemoryApplications::new(30);
        store.seed(ApplicationDoc {
            applicant_id: "u-1".into(),
            ..Default::default()
        });
        store.seed(ApplicationDoc {
            applicant_id: "u-2".into(),
            ..Default::default()
        });

        // An applicant asking for someone else's records gets their own
        let params: ListQuery = serde_urlencoded::from_str("applicant=u-2").unwrap();
        let filter = scoped_filter(&params, &claims_for("u-1", Role::Applicant)).unwrap();
        let mine = store.list(&filter).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].applicant_id, "u-1");

        // Staff keep the requested filter
        let params: ListQuery = serde_urlencoded::from_str("applicant=u-2").unwrap();
        let filter = scoped_filter(&params, &claims_for("rev-1", Role::Reviewer)).unwrap();
        let theirs = store.list(&filter).await.unwrap();
        assert_eq!(theirs.len(), 1);
        assert_eq!(theirs[0].applicant_id, "u-2");
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("/abc123"), Some("abc123".to_string()));
        assert_eq!(parse_id("/abc/extra"), None);
        assert_eq!(parse_id("/"), None);
        assert_eq!(parse_id(""), None);
    }

    #[test]
    fn test_build_filter_from_query() {
        let params: ListQuery =
            serde_urlencoded::from_str("status=submitted,under_review&province=Kigali&reviewer=r1")
                .unwrap();
        let filter = build_filter(&params).unwrap();
        assert_eq!(
            filter.statuses,
            vec![ApplicationStatus::Submitted, ApplicationStatus::UnderReview]
        );
        assert_eq!(filter.provinces, vec!["Kigali".to_string()]);
        assert_eq!(filter.assigned_reviewer.as_deref(), Some("r1"));
    }

    #[test]
    fn test_build_filter_rejects_bad_status() {
        let params: ListQuery = serde_urlencoded::from_str("status=bogus").unwrap();
        assert!(build_filter(&params).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date(Some("2026-01-01T00:00:00Z")).unwrap().is_some());
        assert!(parse_date(None).unwrap().is_none());
        assert!(parse_date(Some("january")).is_err());
    }

    #[test]
    fn test_view_carries_badge() {
        let app = ApplicationDoc {
            status: ApplicationStatus::Submitted,
            ..Default::default()
        };
        let view = ApplicationView::from(&app);
        assert_eq!(view.status, "submitted");
        assert_eq!(view.status_badge, StatusBadge::for_code("submitted"));
    }
}

//! HTTP routes for issued permits
//!
//! - GET  /api/permits                   - List (holders see their own)
//! - POST /api/permits                   - Issue a permit for an approved application
//! - GET  /api/permits/{id}              - Fetch one
//! - GET  /api/permits/{id}/certificate  - Download the PDF certificate
//!
//! The active/expiring/expired classification is derived from the expiry
//! date at read time with the configured lookahead window.

use chrono::{DateTime, Duration, Utc};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::{
    cors_preflight, error_response, full_body, json_response, not_found, parse_json_body,
    require_operation, stores, BoxBody,
};
use crate::auth::Claims;
use crate::certificate::CertificateData;
use crate::db::schemas::PermitDoc;
use crate::server::AppState;
use crate::store::{InspectionFilter, NewPermit, PermitFilter};
use crate::types::{Result, SluiceError};
use crate::workflow::{permit_status, ApplicationStatus, StatusBadge};

// =============================================================================
// Request/Response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct IssuePermitRequest {
    pub application_id: String,
    /// Permit validity end, RFC3339. Defaults to five years from issue.
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PermitView {
    pub id: String,
    pub permit_number: String,
    pub application_id: String,
    pub holder_id: String,
    pub purpose: String,
    pub issued_date: String,
    pub expiry_date: String,
    pub conditions: Vec<String>,
    pub status: String,
    pub status_badge: StatusBadge,
}

impl PermitView {
    fn new(permit: &PermitDoc, now: DateTime<Utc>, lookahead_days: i64) -> Self {
        let status = permit_status(now, permit.expiry_date.to_chrono(), lookahead_days);
        Self {
            id: permit._id.map(|id| id.to_hex()).unwrap_or_default(),
            permit_number: permit.permit_number.clone(),
            application_id: permit.application_id.clone(),
            holder_id: permit.holder_id.clone(),
            purpose: permit.purpose.clone(),
            issued_date: permit.issued_date.to_chrono().to_rfc3339(),
            expiry_date: permit.expiry_date.to_chrono().to_rfc3339(),
            conditions: permit.conditions.clone(),
            status: status.as_str().to_string(),
            status_badge: StatusBadge::for_code(status.as_str()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PermitListResponse {
    pub permits: Vec<PermitView>,
    pub total: usize,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Route /api/permits* requests
pub async fn handle_permit_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<BoxBody> {
    let method = req.method().clone();

    if method == Method::OPTIONS {
        return cors_preflight();
    }

    let rest = path.strip_prefix("/api/permits").unwrap_or("");
    match (method, rest) {
        (Method::GET, "") => handle_list(req, state).await,
        (Method::POST, "") => handle_issue(req, state).await,
        (Method::GET, rest) => {
            if let Some(id) = rest.strip_suffix("/certificate").and_then(parse_id) {
                handle_certificate(req, state, &id).await
            } else if let Some(id) = parse_id(rest) {
                handle_get(req, state, &id).await
            } else {
                not_found(path)
            }
        }
        _ => not_found(path),
    }
}

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
    let claims = match require_operation(&req, &state, "permit_list") {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    let mut filter = PermitFilter::default();
    if !claims.role.is_staff() {
        filter.holder_id = Some(claims.user_id.clone());
    }

    let result = async {
        let permits = stores(&state)?.permits.list(&filter).await?;
        let now = Utc::now();
        let views: Vec<PermitView> = permits
            .iter()
            .map(|p| PermitView::new(p, now, state.args.permit_lookahead_days))
            .collect();
        Ok::<_, SluiceError>(PermitListResponse {
            total: views.len(),
            permits: views,
        })
    }
    .await;

    match result {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => error_response(e),
    }
}

async fn handle_get(req: Request<Incoming>, state: Arc<AppState>, id: &str) -> Response<BoxBody> {
    let claims = match require_operation(&req, &state, "permit_get") {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    match fetch_scoped(&state, &claims, id).await {
        Ok(permit) => json_response(
            StatusCode::OK,
            &PermitView::new(&permit, Utc::now(), state.args.permit_lookahead_days),
        ),
        Err(e) => error_response(e),
    }
}

/// Fetch one permit, enforcing holder ownership for applicants
async fn fetch_scoped(state: &AppState, claims: &Claims, id: &str) -> Result<PermitDoc> {
    let permit = stores(state)?.permits.get(id).await?;
    if !claims.role.is_staff() && permit.holder_id != claims.user_id {
        return Err(SluiceError::NotFound(format!("permit {id}")));
    }
    Ok(permit)
}

async fn handle_issue(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match require_operation(&req, &state, "permit_issue") {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };
    let body: IssuePermitRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    match issue(&state, &claims, body).await {
        Ok(view) => json_response(StatusCode::CREATED, &view),
        Err(e) => error_response(e),
    }
}

async fn issue(state: &AppState, claims: &Claims, body: IssuePermitRequest) -> Result<PermitView> {
    let stores = stores(state)?;
    let application = stores.applications.get(&body.application_id).await?;

    if application.status != ApplicationStatus::Approved {
        return Err(SluiceError::Validation(format!(
            "permits are only issued for approved applications, not {}",
            application.status
        )));
    }

    // One permit per application
    let existing = stores
        .permits
        .list(&PermitFilter {
            application_id: Some(body.application_id.clone()),
            ..Default::default()
        })
        .await?;
    if !existing.is_empty() {
        return Err(SluiceError::Validation(format!(
            "application {} already has permit {}",
            body.application_id, existing[0].permit_number
        )));
    }

    let now = Utc::now();
    let expiry_date = match body.expiry_date.as_deref() {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| SluiceError::BadRequest(format!("Invalid expiry_date: {}", e)))?,
        None => now + Duration::days(5 * 365),
    };

    let sequence = stores.permits.list(&PermitFilter::default()).await?.len() as u32 + 1;

    let permit = stores
        .permits
        .create(NewPermit {
            application_id: body.application_id,
            holder_id: application.applicant_id.clone(),
            purpose: application.water_purpose.clone(),
            issued_date: now,
            expiry_date,
            conditions: body.conditions,
            sequence,
        })
        .await?;

    info!(
        "Permit {} issued by {} for application {}",
        permit.permit_number, claims.identifier, application.application_number
    );
    Ok(PermitView::new(&permit, now, state.args.permit_lookahead_days))
}

/// GET /api/permits/{id}/certificate
///
/// Streams the rendered PDF with an attachment disposition.
async fn handle_certificate(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let claims = match require_operation(&req, &state, "certificate_download") {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };

    match certificate(&state, &claims, id).await {
        Ok((permit_number, bytes)) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/pdf")
            .header(
                "Content-Disposition",
                format!("attachment; filename=\"{}.pdf\"", permit_number),
            )
            .header("Access-Control-Allow-Origin", "*")
            .body(full_body(bytes))
            .unwrap(),
        Err(e) => error_response(e),
    }
}

async fn certificate(state: &AppState, claims: &Claims, id: &str) -> Result<(String, Vec<u8>)> {
    let permit = fetch_scoped(state, claims, id).await?;
    let stores = stores(state)?;

    // Enrich the certificate where the linked records still exist
    let application = stores.applications.get(&permit.application_id).await.ok();
    let holder = stores
        .users
        .find_one(bson::doc! { "_id": crate::store::parse_object_id(&permit.holder_id)? })
        .await
        .ok()
        .flatten();
    let inspection = stores
        .inspections
        .list(&InspectionFilter {
            application_id: Some(permit.application_id.clone()),
            ..Default::default()
        })
        .await
        .ok()
        .and_then(|mut list| if list.is_empty() { None } else { Some(list.remove(0)) });

    let (holder_name, holder_identifier) = match &holder {
        Some(user) => (user.display_name.as_str(), user.identifier.as_str()),
        None => ("Permit Holder", permit.holder_id.as_str()),
    };

    let bytes = state.certificates.render(&CertificateData {
        permit: &permit,
        holder_name,
        holder_identifier,
        application: application.as_ref(),
        inspection: inspection.as_ref(),
    })?;

    info!(
        "Certificate for {} rendered ({} bytes) for {}",
        permit.permit_number,
        bytes.len(),
        claims.identifier
    );
    Ok((permit.permit_number.clone(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::DateTime as BsonDateTime;
    use chrono::TimeZone;

    #[test]
    fn test_view_derives_expiry_status() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let permit = PermitDoc {
            permit_number: "WP-2026-00001".into(),
            issued_date: BsonDateTime::from_chrono(now - Duration::days(300)),
            expiry_date: BsonDateTime::from_chrono(now + Duration::days(10)),
            ..Default::default()
        };

        let view = PermitView::new(&permit, now, 30);
        assert_eq!(view.status, "expiring_soon");
        assert_eq!(view.status_badge, StatusBadge::for_code("expiring_soon"));

        let far = PermitDoc {
            expiry_date: BsonDateTime::from_chrono(now + Duration::days(100)),
            ..permit
        };
        assert_eq!(PermitView::new(&far, now, 30).status, "active");
    }
}

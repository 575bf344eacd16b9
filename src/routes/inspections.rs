//! HTTP routes for site inspections
//!
//! - GET  /api/inspections       - List (staff only; filterable)
//! - POST /api/inspections       - Record a site visit
//! - GET  /api/inspections/{id}  - Fetch one

use chrono::{DateTime, Utc};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::{
    cors_preflight, error_response, json_response, not_found, parse_json_body, require_operation,
    stores, BoxBody,
};
use crate::db::schemas::{InspectionDoc, InspectionFindings};
use crate::server::AppState;
use crate::store::{InspectionFilter, NewInspection};
use crate::types::SluiceError;
use crate::workflow::StatusBadge;

// =============================================================================
// Request/Response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateInspectionRequest {
    pub application_id: String,
    /// RFC3339; defaults to now
    #[serde(default)]
    pub inspection_date: Option<String>,
    pub findings: InspectionFindings,
}

#[derive(Debug, Deserialize, Default)]
struct ListQuery {
    application: Option<String>,
    inspector: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InspectionView {
    pub id: String,
    pub application_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permit_id: Option<String>,
    pub inspector_id: String,
    pub inspection_date: String,
    pub findings: InspectionFindings,
    pub compliance_badge: StatusBadge,
}

impl From<&InspectionDoc> for InspectionView {
    fn from(inspection: &InspectionDoc) -> Self {
        Self {
            id: inspection._id.map(|id| id.to_hex()).unwrap_or_default(),
            application_id: inspection.application_id.clone(),
            permit_id: inspection.permit_id.clone(),
            inspector_id: inspection.inspector_id.clone(),
            inspection_date: inspection.inspection_date.to_chrono().to_rfc3339(),
            compliance_badge: StatusBadge::for_code(inspection.findings.compliance.as_str()),
            findings: inspection.findings.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InspectionListResponse {
    pub inspections: Vec<InspectionView>,
    pub total: usize,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Route /api/inspections* requests
pub async fn handle_inspection_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<BoxBody> {
    let method = req.method().clone();

    if method == Method::OPTIONS {
        return cors_preflight();
    }

    let rest = path.strip_prefix("/api/inspections").unwrap_or("");
    match (method, rest) {
        (Method::GET, "") => handle_list(req, state).await,
        (Method::POST, "") => handle_create(req, state).await,
        (Method::GET, rest) => {
            let id = rest.strip_prefix('/').unwrap_or("");
            if id.is_empty() || id.contains('/') {
                not_found(path)
            } else {
                handle_get(req, state, id).await
            }
        }
        _ => not_found(path),
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn handle_list(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    if let Err(e) = require_operation(&req, &state, "inspection_list") {
        return error_response(e);
    }

    let params: ListQuery = match serde_urlencoded::from_str(req.uri().query().unwrap_or("")) {
        Ok(params) => params,
        Err(e) => return error_response(SluiceError::BadRequest(format!("Invalid query: {}", e))),
    };
    let filter = InspectionFilter {
        application_id: params.application,
        inspector_id: params.inspector,
    };

    let result = async {
        let inspections = stores(&state)?.inspections.list(&filter).await?;
        let views: Vec<InspectionView> = inspections.iter().map(InspectionView::from).collect();
        Ok::<_, SluiceError>(InspectionListResponse {
            total: views.len(),
            inspections: views,
        })
    }
    .await;

    match result {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => error_response(e),
    }
}

async fn handle_get(req: Request<Incoming>, state: Arc<AppState>, id: &str) -> Response<BoxBody> {
    if let Err(e) = require_operation(&req, &state, "inspection_get") {
        return error_response(e);
    }

    let result = async { stores(&state)?.inspections.get(id).await }.await;
    match result {
        Ok(inspection) => json_response(StatusCode::OK, &InspectionView::from(&inspection)),
        Err(e) => error_response(e),
    }
}

async fn handle_create(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match require_operation(&req, &state, "inspection_create") {
        Ok(claims) => claims,
        Err(e) => return error_response(e),
    };
    let body: CreateInspectionRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let inspection_date = match body.inspection_date.as_deref() {
        None => Utc::now(),
        Some(value) => match DateTime::parse_from_rfc3339(value) {
            Ok(date) => date.with_timezone(&Utc),
            Err(e) => {
                return error_response(SluiceError::BadRequest(format!(
                    "Invalid inspection_date: {}",
                    e
                )))
            }
        },
    };

    let result = async {
        // The inspected application must exist
        let application = stores(&state)?.applications.get(&body.application_id).await?;

        let created = stores(&state)?
            .inspections
            .create(NewInspection {
                application_id: body.application_id,
                inspector_id: claims.user_id.clone(),
                inspection_date,
                findings: body.findings,
            })
            .await?;

        info!(
            "Inspection recorded for {} by {} ({})",
            application.application_number,
            claims.identifier,
            created.findings.compliance.as_str()
        );
        Ok::<_, SluiceError>(InspectionView::from(&created))
    }
    .await;

    match result {
        Ok(view) => json_response(StatusCode::CREATED, &view),
        Err(e) => error_response(e),
    }
}

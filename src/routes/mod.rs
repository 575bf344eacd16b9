//! HTTP routes for Sluice

pub mod applications;
pub mod auth_routes;
pub mod dashboard;
pub mod health;
pub mod inspections;
pub mod permits;

pub use applications::handle_application_request;
pub use auth_routes::handle_auth_request;
pub use dashboard::handle_dashboard_summary;
pub use health::{health_check, readiness_check, version_info};
pub use inspections::handle_inspection_request;
pub use permits::handle_permit_request;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{extract_token_from_header, is_operation_allowed, Claims};
use crate::server::AppState;
use crate::store::Stores;
use crate::types::{Result, SluiceError};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

// =============================================================================
// Response helpers
// =============================================================================

pub(crate) fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub(crate) fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

/// Map a domain error onto the wire: status from the error taxonomy, message
/// in the body.
pub(crate) fn error_response(err: SluiceError) -> Response<BoxBody> {
    let (status, message) = err.into_status_code_and_body();
    json_response(status, &ErrorResponse { error: message })
}

pub(crate) fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub(crate) fn not_found(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("Not found: {}", path),
        },
    )
}

// =============================================================================
// Request helpers
// =============================================================================

pub(crate) async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| SluiceError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(SluiceError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| SluiceError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Authenticate the request from its bearer token
pub(crate) fn authenticate(req: &Request<Incoming>, state: &AppState) -> Result<Claims> {
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| SluiceError::Unauthorized("Missing Authorization header".into()))?;

    let token = extract_token_from_header(header)
        .ok_or_else(|| SluiceError::Unauthorized("Malformed Authorization header".into()))?;

    let claims = state.jwt.validate_token(token)?;
    if !claims.verified {
        return Err(SluiceError::Forbidden(
            "Account has not completed signup verification".into(),
        ));
    }
    Ok(claims)
}

/// Authenticate and check the role table for one operation
pub(crate) fn require_operation(
    req: &Request<Incoming>,
    state: &AppState,
    operation: &str,
) -> Result<Claims> {
    let claims = authenticate(req, state)?;
    if !is_operation_allowed(operation, claims.role) {
        return Err(SluiceError::Forbidden(format!(
            "Role {} may not perform {}",
            claims.role, operation
        )));
    }
    Ok(claims)
}

/// Record stores, or a transport error when the service started without them
pub(crate) fn stores(state: &AppState) -> Result<&Stores> {
    state
        .stores
        .as_ref()
        .ok_or_else(|| SluiceError::Database("Record store is not available".into()))
}

/// Split a comma-separated query value into parsed items
pub(crate) fn parse_csv<T: std::str::FromStr>(value: &str) -> Result<Vec<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim()
                .parse::<T>()
                .map_err(|e| SluiceError::BadRequest(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ApplicationStatus;

    #[test]
    fn test_parse_csv_statuses() {
        let statuses: Vec<ApplicationStatus> = parse_csv("submitted, under_review").unwrap();
        assert_eq!(
            statuses,
            vec![ApplicationStatus::Submitted, ApplicationStatus::UnderReview]
        );
        assert!(parse_csv::<ApplicationStatus>("submitted,bogus").is_err());
        assert!(parse_csv::<ApplicationStatus>("").unwrap().is_empty());
    }
}

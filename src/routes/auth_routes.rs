//! HTTP routes for authentication
//!
//! - POST /auth/signup - Submit signup details, dispatch a verification code
//! - POST /auth/verify - Confirm the verification code, get a session token
//! - POST /auth/resend - Ask for a fresh verification code
//! - POST /auth/login  - Authenticate with password, get a session token
//! - GET  /auth/me     - Current session info from the token
//!
//! Signup is a three-step flow (details, code, confirmed); codes are checked
//! for real with bounded attempts and a resend cooldown. In dev mode the code
//! is echoed in the response so the flow can be exercised without a mail
//! relay; otherwise it is only logged at debug level by the code store.

use bson::doc;
use chrono::Utc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::{
    authenticate, cors_preflight, error_response, json_response, not_found, parse_json_body,
    stores, BoxBody, ErrorResponse, SuccessResponse,
};
use crate::auth::{
    hash_password, verify_password, BeginOutcome, CodeCheck, ResendOutcome, Role, TokenInput,
};
use crate::db::schemas::UserDoc;
use crate::server::AppState;
use crate::types::{Result, SluiceError};

// =============================================================================
// Request/Response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub identifier: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub identifier: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    pub identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    /// Set when a restart hit the resend cooldown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<i64>,
    /// Verification code, echoed only in dev mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: u64,
    pub identifier: String,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub identifier: String,
    pub role: Role,
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct ResendResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<i64>,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Route /auth/* requests
pub async fn handle_auth_request(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::OPTIONS, _) => cors_preflight(),
        (Method::POST, "/auth/signup") => handle_signup(req, state).await,
        (Method::POST, "/auth/verify") => handle_verify(req, state).await,
        (Method::POST, "/auth/resend") => handle_resend(req, state).await,
        (Method::POST, "/auth/login") => handle_login(req, state).await,
        (Method::POST, "/auth/logout") => logout_response(),
        (Method::GET, "/auth/me") => handle_me(req, state),
        _ => not_found(&path),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /auth/signup
///
/// Store (or refresh) unverified credentials and dispatch a verification
/// code. A verified identifier cannot sign up again.
async fn handle_signup(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: SignupRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    match signup(&state, body).await {
        Ok((status, response)) => json_response(status, &response),
        Err(e) => error_response(e),
    }
}

async fn signup(state: &AppState, body: SignupRequest) -> Result<(StatusCode, SignupResponse)> {
    if body.identifier.trim().is_empty() || body.password.is_empty() {
        return Err(SluiceError::Validation(
            "identifier and password are required".into(),
        ));
    }
    if body.password.len() < 8 {
        return Err(SluiceError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }

    let stores = stores(state)?;
    let identifier = body.identifier.trim().to_string();
    let password_hash = hash_password(&body.password)?;
    let display_name = if body.display_name.trim().is_empty() {
        identifier
            .split('@')
            .next()
            .unwrap_or("Applicant")
            .to_string()
    } else {
        body.display_name.trim().to_string()
    };

    match stores.users.find_one(doc! { "identifier": &identifier }).await? {
        Some(existing) if existing.verified => {
            return Err(SluiceError::Validation(format!(
                "{} is already registered",
                identifier
            )));
        }
        Some(_) => {
            // Unverified retry: refresh the stored details and reissue a code
            stores
                .users
                .update_one(
                    doc! { "identifier": &identifier },
                    doc! { "$set": {
                        "password_hash": &password_hash,
                        "display_name": &display_name,
                    }},
                )
                .await?;
        }
        None => {
            let user = UserDoc::new(
                identifier.clone(),
                password_hash,
                display_name,
                Role::Applicant,
            );
            stores.users.insert_one(user).await?;
        }
    }

    let code = match state.signup.begin(&identifier, Utc::now())? {
        BeginOutcome::Started { code } => code,
        BeginOutcome::CoolingDown { remaining_seconds } => {
            // Re-submitting the form must not outpace the resend control
            return Ok((
                StatusCode::TOO_MANY_REQUESTS,
                SignupResponse {
                    success: false,
                    message: format!(
                        "A code was already sent, wait {} second(s)",
                        remaining_seconds
                    ),
                    retry_after_seconds: Some(remaining_seconds),
                    dev_code: None,
                },
            ));
        }
    };
    info!("Signup started for {}, verification code dispatched", identifier);

    Ok((
        StatusCode::OK,
        SignupResponse {
            success: true,
            message: "Verification code sent".into(),
            retry_after_seconds: None,
            dev_code: if state.args.dev_mode { Some(code) } else { None },
        },
    ))
}

/// POST /auth/verify
///
/// Check the submitted code; on a match, mark the account verified and open a
/// session.
async fn handle_verify(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: VerifyRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let check = match state.signup.verify(&body.identifier, &body.code, Utc::now()) {
        Ok(check) => check,
        Err(e) => return error_response(e),
    };

    match check {
        CodeCheck::Confirmed => match open_verified_session(&state, &body.identifier).await {
            Ok(response) => json_response(StatusCode::OK, &response),
            Err(e) => error_response(e),
        },
        CodeCheck::Mismatch { remaining_attempts } => {
            warn!("Wrong verification code for {}", body.identifier);
            json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: format!(
                        "Wrong code, {} attempt(s) remaining",
                        remaining_attempts
                    ),
                },
            )
        }
        CodeCheck::AttemptsExhausted => json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse {
                error: "Too many wrong attempts, request a new code".into(),
            },
        ),
        CodeCheck::Expired => json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse {
                error: "Verification code expired, request a new code".into(),
            },
        ),
        CodeCheck::NoPending => error_response(SluiceError::NotFound(format!(
            "no pending verification for {}",
            body.identifier
        ))),
    }
}

async fn open_verified_session(state: &AppState, identifier: &str) -> Result<AuthResponse> {
    let stores = stores(state)?;

    stores
        .users
        .update_one(
            doc! { "identifier": identifier },
            doc! { "$set": { "verified": true } },
        )
        .await?;

    let user = stores
        .users
        .find_one(doc! { "identifier": identifier })
        .await?
        .ok_or_else(|| SluiceError::NotFound(format!("user {}", identifier)))?;

    info!("Signup confirmed for {}", identifier);
    issue_token(state, &user)
}

/// POST /auth/resend
async fn handle_resend(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: ResendRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    match state.signup.resend(&body.identifier, Utc::now()) {
        Ok(ResendOutcome::Reissued) => json_response(
            StatusCode::OK,
            &ResendResponse {
                success: true,
                message: "A new verification code was sent".into(),
                retry_after_seconds: None,
            },
        ),
        Ok(ResendOutcome::CoolingDown { remaining_seconds }) => json_response(
            StatusCode::TOO_MANY_REQUESTS,
            &ResendResponse {
                success: false,
                message: format!("Please wait {} second(s) before resending", remaining_seconds),
                retry_after_seconds: Some(remaining_seconds),
            },
        ),
        Ok(ResendOutcome::NoPending) => error_response(SluiceError::NotFound(format!(
            "no pending verification for {}",
            body.identifier
        ))),
        Err(e) => error_response(e),
    }
}

/// POST /auth/login
async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    match login(&state, body).await {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => error_response(e),
    }
}

async fn login(state: &AppState, body: LoginRequest) -> Result<AuthResponse> {
    let stores = stores(state)?;

    let user = stores
        .users
        .find_one(doc! { "identifier": &body.identifier })
        .await?
        .ok_or_else(|| SluiceError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(&body.password, &user.password_hash)? {
        warn!("Failed login attempt for {}", body.identifier);
        return Err(SluiceError::Unauthorized("Invalid credentials".into()));
    }
    if !user.is_active {
        return Err(SluiceError::Forbidden("Account is deactivated".into()));
    }
    if !user.verified {
        return Err(SluiceError::Forbidden(
            "Account has not completed signup verification".into(),
        ));
    }

    info!("Login for {} ({})", user.identifier, user.role);
    issue_token(state, &user)
}

fn issue_token(state: &AppState, user: &UserDoc) -> Result<AuthResponse> {
    let user_id = user
        ._id
        .map(|id| id.to_hex())
        .ok_or_else(|| SluiceError::Internal("user record has no id".into()))?;

    let (token, expires_at) = state.jwt.generate_token(TokenInput {
        user_id,
        identifier: user.identifier.clone(),
        role: user.role,
        verified: user.verified,
        version: user.token_version,
    })?;

    Ok(AuthResponse {
        token,
        expires_at,
        identifier: user.identifier.clone(),
        display_name: user.display_name.clone(),
        role: user.role,
    })
}

/// GET /auth/me
fn handle_me(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    match authenticate(&req, &state) {
        Ok(claims) => json_response(
            StatusCode::OK,
            &MeResponse {
                user_id: claims.user_id,
                identifier: claims.identifier,
                role: claims.role,
                verified: claims.verified,
            },
        ),
        Err(e) => error_response(e),
    }
}

/// POST /auth/logout
///
/// Token disposal happens client-side; the endpoint exists for API symmetry.
fn logout_response() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &SuccessResponse {
            success: true,
            message: "Logged out".into(),
        },
    )
}

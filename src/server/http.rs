//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection. Routing is a
//! method/path match that hands off to the route modules.

use chrono::Duration;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{body::Incoming, Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{JwtValidator, SignupFlows, VerificationConfig, VerificationStore};
use crate::certificate::CertificateRenderer;
use crate::config::Args;
use crate::db::MongoClient;
use crate::routes;
use crate::routes::BoxBody;
use crate::store::Stores;
use crate::types::{Result, SluiceError};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// Record stores; absent only in dev mode without a reachable store
    pub stores: Option<Stores>,
    pub jwt: JwtValidator,
    /// Pending verification codes
    pub verification: Arc<VerificationStore>,
    /// In-flight signup flows
    pub signup: Arc<SignupFlows>,
    pub certificates: CertificateRenderer,
}

impl AppState {
    /// Build state without a record store (dev mode only)
    pub fn new(args: Args) -> Result<Self> {
        Self::build(args, None, None)
    }

    /// Build state with a connected record store
    pub fn with_stores(args: Args, mongo: MongoClient, stores: Stores) -> Result<Self> {
        Self::build(args, Some(mongo), Some(stores))
    }

    fn build(args: Args, mongo: Option<MongoClient>, stores: Option<Stores>) -> Result<Self> {
        let jwt = match &args.jwt_secret {
            Some(secret) => JwtValidator::new(secret.clone(), args.jwt_expiry_seconds)?,
            None if args.dev_mode => JwtValidator::new_dev(),
            None => {
                return Err(SluiceError::Config(
                    "JWT_SECRET is required in production mode".into(),
                ))
            }
        };

        let verification = Arc::new(VerificationStore::new(VerificationConfig {
            expiry: Duration::seconds(args.verification_expiry_seconds),
            resend_cooldown: Duration::seconds(args.verification_resend_cooldown_seconds),
            max_attempts: args.verification_max_attempts,
        }));
        let signup = Arc::new(SignupFlows::new(Arc::clone(&verification)));

        let certificates = CertificateRenderer::new(
            args.cert_authority_logo.clone().map(PathBuf::from),
            args.cert_ministry_logo.clone().map(PathBuf::from),
        );

        Ok(Self {
            args,
            mongo,
            stores,
            jwt,
            verification,
            signup,
            certificates,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Sluice listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - verification codes are echoed in responses");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    if path.starts_with("/auth") {
        return Ok(routes::handle_auth_request(req, state).await);
    }
    if path.starts_with("/api/applications") {
        return Ok(routes::handle_application_request(req, state, &path).await);
    }
    if path.starts_with("/api/permits") {
        return Ok(routes::handle_permit_request(req, state, &path).await);
    }
    if path.starts_with("/api/inspections") {
        return Ok(routes::handle_inspection_request(req, state, &path).await);
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(state),
        (Method::GET, "/ready") | (Method::GET, "/readyz") => routes::readiness_check(state),
        (Method::GET, "/version") => routes::version_info(),
        (Method::GET, "/api/dashboard/summary") => {
            routes::handle_dashboard_summary(req, state).await
        }
        (Method::OPTIONS, _) => routes::cors_preflight(),
        _ => routes::not_found(&path),
    };

    Ok(response)
}

//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - Liveness (is the service running?)
//! - /ready, /readyz   - Readiness (is the record store reachable?)
//! - /version          - Build version for deployment verification
//!
//! Liveness always answers 200 while the process runs. Readiness answers 200
//! only when the record store is connected, unless dev mode relaxed startup.

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    pub node_id: String,
    pub mode: &'static str,
    pub store: StoreHealth,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct StoreHealth {
    pub connected: bool,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// GET /health - liveness probe
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    let connected = state.stores.is_some();
    let status = if connected { "online" } else { "degraded" };

    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            status,
            version: env!("CARGO_PKG_VERSION"),
            node_id: state.args.node_id.to_string(),
            mode: if state.args.dev_mode { "dev" } else { "production" },
            store: StoreHealth { connected },
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    )
}

/// GET /ready - readiness probe
pub fn readiness_check(state: Arc<AppState>) -> Response<BoxBody> {
    let connected = state.stores.is_some();
    let ready = connected || state.args.dev_mode;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    json_response(
        status,
        &HealthResponse {
            healthy: ready,
            status: if connected { "online" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            node_id: state.args.node_id.to_string(),
            mode: if state.args.dev_mode { "dev" } else { "production" },
            store: StoreHealth { connected },
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    )
}

/// GET /version
pub fn version_info() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

//! Sluice - water-use permit portal backend
//!
//! Citizens apply for water-use permits; staff review, inspect and decide;
//! approved applications become permits with printable PDF certificates.
//!
//! ## Services
//!
//! - **Auth**: signup with verification codes, password login, JWT sessions
//! - **Applications**: draft/submit/review lifecycle with SLA tracking
//! - **Inspections**: field verification records
//! - **Permits**: issuance, expiry classification, certificate rendering
//! - **Dashboard**: aggregate counts for the staff review queue

pub mod auth;
pub mod certificate;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;
pub mod workflow;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, SluiceError};

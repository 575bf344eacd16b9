//! Document schemas for the record store

pub mod application;
pub mod inspection;
pub mod metadata;
pub mod permit;
pub mod user;

pub use application::{
    ApplicationDoc, ApplicationType, LocationRef, APPLICATION_COLLECTION,
};
pub use inspection::{InspectionDoc, InspectionFindings, INSPECTION_COLLECTION};
pub use metadata::Metadata;
pub use permit::{PermitDoc, PERMIT_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};

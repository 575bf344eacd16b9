//! Inspection document schema
//!
//! Field-verification record linked to an application and, once issued, its
//! permit.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::workflow::InspectionOutcome;

/// Collection name for inspections
pub const INSPECTION_COLLECTION: &str = "inspections";

/// Nested findings recorded during a site visit
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InspectionFindings {
    /// Declared site location matched what was found on the ground
    pub location_accurate: bool,
    /// Technical setup (abstraction point, metering) verified
    pub technical_verified: bool,
    /// Environmental impact rating: low, moderate, high
    pub environmental_impact: String,
    /// Photographic evidence collected
    pub evidence_photos: bool,
    /// Supporting documents collected
    pub evidence_documents: bool,
    /// Compliance outcome of the visit
    pub compliance: InspectionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
}

impl Default for InspectionFindings {
    fn default() -> Self {
        Self {
            location_accurate: false,
            technical_verified: false,
            environmental_impact: "low".to_string(),
            evidence_photos: false,
            evidence_documents: false,
            compliance: InspectionOutcome::Compliant,
            recommendations: None,
        }
    }
}

/// Inspection document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InspectionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Inspected application id (hex ObjectId)
    pub application_id: String,

    /// Permit id once one exists for the application
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permit_id: Option<String>,

    /// Identifier of the inspector user
    pub inspector_id: String,

    pub inspection_date: DateTime,

    #[serde(default)]
    pub findings: InspectionFindings,
}

// bson::DateTime has no Default, so inspection_date gets the epoch
impl Default for InspectionDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            application_id: String::new(),
            permit_id: None,
            inspector_id: String::new(),
            inspection_date: DateTime::from_millis(0),
            findings: InspectionFindings::default(),
        }
    }
}

impl IntoIndexes for InspectionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "application_id": 1 },
                Some(IndexOptions::builder().name("application_id_index".to_string()).build()),
            ),
            (
                doc! { "inspector_id": 1 },
                Some(IndexOptions::builder().name("inspector_id_index".to_string()).build()),
            ),
            (
                doc! { "inspection_date": -1 },
                Some(IndexOptions::builder().name("inspection_date_desc_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for InspectionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

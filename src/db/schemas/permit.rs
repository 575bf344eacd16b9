//! Permit document schema
//!
//! An issued grant derived from an approved application. The derived
//! active/expiring/expired status is computed from expiry_date at read time,
//! never stored.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for permits
pub const PERMIT_COLLECTION: &str = "permits";

/// Permit document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PermitDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Human-facing permit number (e.g. WP-2026-00042)
    pub permit_number: String,

    /// Originating application id (hex ObjectId)
    pub application_id: String,

    /// Identifier of the permit holder
    pub holder_id: String,

    /// Permitted water use
    pub purpose: String,

    pub issued_date: DateTime,
    pub expiry_date: DateTime,

    /// Numbered conditions printed on the certificate
    #[serde(default)]
    pub conditions: Vec<String>,
}

// bson::DateTime has no Default, so the date fields get the epoch
impl Default for PermitDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            permit_number: String::new(),
            application_id: String::new(),
            holder_id: String::new(),
            purpose: String::new(),
            issued_date: DateTime::from_millis(0),
            expiry_date: DateTime::from_millis(0),
            conditions: Vec::new(),
        }
    }
}

impl PermitDoc {
    /// Generate a human-facing permit number
    pub fn generate_number(year: i32, sequence: u32) -> String {
        format!("WP-{}-{:05}", year, sequence)
    }
}

impl IntoIndexes for PermitDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "permit_number": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("permit_number_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "application_id": 1 },
                Some(IndexOptions::builder().name("application_id_index".to_string()).build()),
            ),
            (
                doc! { "holder_id": 1 },
                Some(IndexOptions::builder().name("holder_id_index".to_string()).build()),
            ),
            (
                doc! { "expiry_date": 1 },
                Some(IndexOptions::builder().name("expiry_date_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for PermitDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

//! Application document schema
//!
//! A citizen's request for a water-use permit, carrying project, location
//! and technical detail plus its lifecycle status.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::workflow::{ApplicationStatus, SlaStatus};

/// Collection name for applications
pub const APPLICATION_COLLECTION: &str = "applications";

/// Category of water use applied for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    SurfaceWater,
    Groundwater,
    Industrial,
    Domestic,
    Irrigation,
}

impl ApplicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SurfaceWater => "surface_water",
            Self::Groundwater => "groundwater",
            Self::Industrial => "industrial",
            Self::Domestic => "domestic",
            Self::Irrigation => "irrigation",
        }
    }
}

impl Default for ApplicationType {
    fn default() -> Self {
        Self::SurfaceWater
    }
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApplicationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "surface_water" => Ok(Self::SurfaceWater),
            "groundwater" => Ok(Self::Groundwater),
            "industrial" => Ok(Self::Industrial),
            "domestic" => Ok(Self::Domestic),
            "irrigation" => Ok(Self::Irrigation),
            other => Err(format!("unknown application type: {other}")),
        }
    }
}

/// Administrative location hierarchy
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LocationRef {
    pub province: String,
    pub district: String,
    pub sector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
}

/// Application document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApplicationDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Human-facing application number (e.g. WPA-2026-1F3A9C)
    pub application_number: String,

    /// Identifier of the applicant user
    pub applicant_id: String,

    pub application_type: ApplicationType,
    pub water_source: String,
    pub water_purpose: String,
    pub location: LocationRef,

    pub project_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_description: Option<String>,

    /// Requested usage volume, in usage_unit
    pub usage_volume: f64,
    /// Unit for usage_volume (e.g. "m3/day")
    pub usage_unit: String,
    /// Estimated project value
    pub project_value: f64,

    pub status: ApplicationStatus,

    /// Snapshot of the review-deadline classification, recomputed on status change
    pub sla_status: SlaStatus,

    /// Deadline for the review decision, set at submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_deadline: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_reviewer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_inspector: Option<String>,

    /// Set when status is rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl Default for ApplicationDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            application_number: String::new(),
            applicant_id: String::new(),
            application_type: ApplicationType::default(),
            water_source: String::new(),
            water_purpose: String::new(),
            location: LocationRef::default(),
            project_title: String::new(),
            project_description: None,
            usage_volume: 0.0,
            usage_unit: String::new(),
            project_value: 0.0,
            status: ApplicationStatus::Draft,
            sla_status: SlaStatus::OnTime,
            review_deadline: None,
            submitted_at: None,
            reviewed_at: None,
            approved_at: None,
            assigned_reviewer: None,
            assigned_inspector: None,
            rejection_reason: None,
        }
    }
}

impl ApplicationDoc {
    /// Generate a human-facing application number
    pub fn generate_number(year: i32) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("WPA-{}-{}", year, &suffix[..6].to_uppercase())
    }
}

impl IntoIndexes for ApplicationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "application_number": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("application_number_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "applicant_id": 1 },
                Some(IndexOptions::builder().name("applicant_id_index".to_string()).build()),
            ),
            (
                doc! { "status": 1 },
                Some(IndexOptions::builder().name("status_index".to_string()).build()),
            ),
            (
                doc! { "assigned_reviewer": 1 },
                Some(IndexOptions::builder().name("assigned_reviewer_index".to_string()).build()),
            ),
            (
                doc! { "metadata.created_at": -1 },
                Some(IndexOptions::builder().name("created_at_desc_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for ApplicationDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_number_format() {
        let number = ApplicationDoc::generate_number(2026);
        assert!(number.starts_with("WPA-2026-"));
        assert_eq!(number.len(), "WPA-2026-".len() + 6);
    }

    #[test]
    fn test_application_type_round_trip() {
        for ty in [
            ApplicationType::SurfaceWater,
            ApplicationType::Groundwater,
            ApplicationType::Industrial,
            ApplicationType::Domestic,
            ApplicationType::Irrigation,
        ] {
            assert_eq!(ty.as_str().parse::<ApplicationType>(), Ok(ty));
        }
        assert!("steam".parse::<ApplicationType>().is_err());
    }
}

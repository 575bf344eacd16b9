//! Record store access
//!
//! One contract for every view: typed CRUD over the external store with
//! simple equality/set/range filters. Each operation surfaces a
//! distinguishable error (not-found vs transport vs validation vs
//! permission) instead of panicking. Lists order by creation time,
//! descending, by default.
//!
//! The traits are the seam for test doubles; Mongo implementations live in
//! the sibling modules, an in-memory double in `memory` for tests.

pub mod applications;
pub mod inspections;
#[cfg(test)]
pub mod memory;
pub mod permits;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::types::SluiceError;

use crate::db::schemas::{
    ApplicationDoc, ApplicationType, InspectionDoc, PermitDoc, UserDoc, APPLICATION_COLLECTION,
    INSPECTION_COLLECTION, PERMIT_COLLECTION, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::Result;
use crate::workflow::ApplicationStatus;

pub use applications::{ApplicationPatch, MongoApplicationStore, NewApplication, StatusChange};
pub use inspections::{InspectionFilter, MongoInspectionStore, NewInspection};
pub use permits::{MongoPermitStore, NewPermit, PermitFilter};

/// Parse a caller-supplied record id
pub(crate) fn parse_object_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id)
        .map_err(|_| SluiceError::BadRequest(format!("invalid record id: {id}")))
}

/// Filters for listing applications
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    /// status in set
    pub statuses: Vec<ApplicationStatus>,
    /// application_type in set
    pub types: Vec<ApplicationType>,
    /// location.province in set
    pub provinces: Vec<String>,
    /// water_source in set
    pub water_sources: Vec<String>,
    /// assigned reviewer equality
    pub assigned_reviewer: Option<String>,
    /// assigned inspector equality
    pub assigned_inspector: Option<String>,
    /// applicant equality (applicants are scoped to their own records)
    pub applicant_id: Option<String>,
    /// created-at range, inclusive
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl ApplicationFilter {
    /// Build the store query document
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();

        if !self.statuses.is_empty() {
            let codes: Vec<&str> = self.statuses.iter().map(|s| s.as_str()).collect();
            filter.insert("status", doc! { "$in": codes });
        }
        if !self.types.is_empty() {
            let codes: Vec<&str> = self.types.iter().map(|t| t.as_str()).collect();
            filter.insert("application_type", doc! { "$in": codes });
        }
        if !self.provinces.is_empty() {
            filter.insert("location.province", doc! { "$in": self.provinces.clone() });
        }
        if !self.water_sources.is_empty() {
            filter.insert("water_source", doc! { "$in": self.water_sources.clone() });
        }
        if let Some(reviewer) = &self.assigned_reviewer {
            filter.insert("assigned_reviewer", reviewer.clone());
        }
        if let Some(inspector) = &self.assigned_inspector {
            filter.insert("assigned_inspector", inspector.clone());
        }
        if let Some(applicant) = &self.applicant_id {
            filter.insert("applicant_id", applicant.clone());
        }

        let mut range = Document::new();
        if let Some(after) = self.created_after {
            range.insert("$gte", BsonDateTime::from_chrono(after));
        }
        if let Some(before) = self.created_before {
            range.insert("$lte", BsonDateTime::from_chrono(before));
        }
        if !range.is_empty() {
            filter.insert("metadata.created_at", range);
        }

        filter
    }

    /// Predicate form of the same filter, used by the in-memory double
    pub fn matches(&self, app: &ApplicationDoc) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&app.status) {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&app.application_type) {
            return false;
        }
        if !self.provinces.is_empty() && !self.provinces.contains(&app.location.province) {
            return false;
        }
        if !self.water_sources.is_empty() && !self.water_sources.contains(&app.water_source) {
            return false;
        }
        if let Some(reviewer) = &self.assigned_reviewer {
            if app.assigned_reviewer.as_ref() != Some(reviewer) {
                return false;
            }
        }
        if let Some(inspector) = &self.assigned_inspector {
            if app.assigned_inspector.as_ref() != Some(inspector) {
                return false;
            }
        }
        if let Some(applicant) = &self.applicant_id {
            if &app.applicant_id != applicant {
                return false;
            }
        }
        let created = app.metadata.created_at.map(|d| d.to_chrono());
        if let Some(after) = self.created_after {
            match created {
                Some(created) if created >= after => {}
                _ => return false,
            }
        }
        if let Some(before) = self.created_before {
            match created {
                Some(created) if created <= before => {}
                _ => return false,
            }
        }
        true
    }
}

/// Application record access
#[async_trait]
pub trait ApplicationRecords: Send + Sync {
    async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationDoc>>;
    async fn get(&self, id: &str) -> Result<ApplicationDoc>;
    async fn create(&self, new: NewApplication) -> Result<ApplicationDoc>;
    async fn update(&self, id: &str, patch: ApplicationPatch) -> Result<ApplicationDoc>;
    /// Validated lifecycle transition; stamps the matching timestamp and
    /// recomputes the SLA snapshot.
    async fn update_status(&self, id: &str, change: StatusChange) -> Result<ApplicationDoc>;
    async fn remove(&self, id: &str) -> Result<()>;
}

/// Permit record access
#[async_trait]
pub trait PermitRecords: Send + Sync {
    async fn list(&self, filter: &PermitFilter) -> Result<Vec<PermitDoc>>;
    async fn get(&self, id: &str) -> Result<PermitDoc>;
    async fn create(&self, new: NewPermit) -> Result<PermitDoc>;
    async fn remove(&self, id: &str) -> Result<()>;
}

/// Inspection record access
#[async_trait]
pub trait InspectionRecords: Send + Sync {
    async fn list(&self, filter: &InspectionFilter) -> Result<Vec<InspectionDoc>>;
    async fn get(&self, id: &str) -> Result<InspectionDoc>;
    async fn create(&self, new: NewInspection) -> Result<InspectionDoc>;
}

/// All store handles, built once at startup
pub struct Stores {
    pub applications: Arc<dyn ApplicationRecords>,
    pub permits: Arc<dyn PermitRecords>,
    pub inspections: Arc<dyn InspectionRecords>,
    pub users: MongoCollection<UserDoc>,
}

impl Stores {
    /// Open every collection and apply its indexes
    pub async fn init(mongo: &MongoClient, review_sla_days: i64) -> Result<Self> {
        let applications = mongo
            .collection::<ApplicationDoc>(APPLICATION_COLLECTION)
            .await?;
        let permits = mongo.collection::<PermitDoc>(PERMIT_COLLECTION).await?;
        let inspections = mongo
            .collection::<InspectionDoc>(INSPECTION_COLLECTION)
            .await?;
        let users = mongo.collection::<UserDoc>(USER_COLLECTION).await?;

        Ok(Self {
            applications: Arc::new(MongoApplicationStore::new(applications, review_sla_days)),
            permits: Arc::new(MongoPermitStore::new(permits)),
            inspections: Arc::new(MongoInspectionStore::new(inspections)),
            users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_filter_builds_empty_document() {
        assert!(ApplicationFilter::default().to_document().is_empty());
    }

    #[test]
    fn test_set_filters_use_in() {
        let filter = ApplicationFilter {
            statuses: vec![ApplicationStatus::Submitted, ApplicationStatus::UnderReview],
            types: vec![ApplicationType::Industrial],
            provinces: vec!["Eastern".into()],
            ..Default::default()
        };
        let doc = filter.to_document();

        let statuses = doc.get_document("status").unwrap().get_array("$in").unwrap();
        assert_eq!(statuses.len(), 2);
        let types = doc.get_document("application_type").unwrap().get_array("$in").unwrap();
        assert_eq!(types.len(), 1);
        assert!(doc.get_document("location.province").is_ok());
        assert!(doc.get("water_source").is_none());
    }

    #[test]
    fn test_equality_and_range_filters() {
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let filter = ApplicationFilter {
            assigned_reviewer: Some("rev-1".into()),
            created_after: Some(after),
            created_before: Some(before),
            ..Default::default()
        };
        let doc = filter.to_document();

        assert_eq!(doc.get_str("assigned_reviewer").unwrap(), "rev-1");
        let range = doc.get_document("metadata.created_at").unwrap();
        assert!(range.get("$gte").is_some());
        assert!(range.get("$lte").is_some());
    }

    #[test]
    fn test_predicate_agrees_with_fields() {
        let mut app = ApplicationDoc {
            applicant_id: "u-1".into(),
            water_source: "Nyabarongo".into(),
            status: ApplicationStatus::Submitted,
            ..Default::default()
        };
        app.location.province = "Kigali".into();

        let mut filter = ApplicationFilter {
            statuses: vec![ApplicationStatus::Submitted],
            provinces: vec!["Kigali".into()],
            water_sources: vec!["Nyabarongo".into()],
            applicant_id: Some("u-1".into()),
            ..Default::default()
        };
        assert!(filter.matches(&app));

        filter.statuses = vec![ApplicationStatus::Approved];
        assert!(!filter.matches(&app));
    }
}

//! Inspection record store

use async_trait::async_trait;
use bson::{doc, DateTime as BsonDateTime, Document};
use chrono::{DateTime, Utc};

use super::{parse_object_id, InspectionRecords};
use crate::db::schemas::{InspectionDoc, InspectionFindings, Metadata};
use crate::db::MongoCollection;
use crate::types::{Result, SluiceError};

/// Filters for listing inspections
#[derive(Debug, Clone, Default)]
pub struct InspectionFilter {
    pub application_id: Option<String>,
    pub inspector_id: Option<String>,
}

impl InspectionFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(application) = &self.application_id {
            filter.insert("application_id", application.clone());
        }
        if let Some(inspector) = &self.inspector_id {
            filter.insert("inspector_id", inspector.clone());
        }
        filter
    }

    /// Predicate form, used by the in-memory double
    pub fn matches(&self, inspection: &InspectionDoc) -> bool {
        if let Some(application) = &self.application_id {
            if &inspection.application_id != application {
                return false;
            }
        }
        if let Some(inspector) = &self.inspector_id {
            if &inspection.inspector_id != inspector {
                return false;
            }
        }
        true
    }
}

/// Fields required to record a site visit
#[derive(Debug, Clone)]
pub struct NewInspection {
    pub application_id: String,
    pub inspector_id: String,
    pub inspection_date: DateTime<Utc>,
    pub findings: InspectionFindings,
}

impl NewInspection {
    pub fn validate(&self) -> Result<()> {
        if self.application_id.is_empty() || self.inspector_id.is_empty() {
            return Err(SluiceError::Validation(
                "application_id and inspector_id are required".into(),
            ));
        }
        match self.findings.environmental_impact.as_str() {
            "low" | "moderate" | "high" => Ok(()),
            other => Err(SluiceError::Validation(format!(
                "unknown environmental impact rating: {other}"
            ))),
        }
    }

    pub(crate) fn into_doc(self) -> InspectionDoc {
        InspectionDoc {
            application_id: self.application_id,
            inspector_id: self.inspector_id,
            inspection_date: BsonDateTime::from_chrono(self.inspection_date),
            findings: self.findings,
            ..Default::default()
        }
    }
}

/// Mongo-backed inspection store
pub struct MongoInspectionStore {
    coll: MongoCollection<InspectionDoc>,
}

impl MongoInspectionStore {
    pub fn new(coll: MongoCollection<InspectionDoc>) -> Self {
        Self { coll }
    }
}

#[async_trait]
impl InspectionRecords for MongoInspectionStore {
    async fn list(&self, filter: &InspectionFilter) -> Result<Vec<InspectionDoc>> {
        self.coll
            .find_many(filter.to_document(), Some(doc! { "inspection_date": -1 }))
            .await
    }

    async fn get(&self, id: &str) -> Result<InspectionDoc> {
        let oid = parse_object_id(id)?;
        self.coll
            .find_by_id(oid)
            .await?
            .ok_or_else(|| SluiceError::NotFound(format!("inspection {id}")))
    }

    async fn create(&self, new: NewInspection) -> Result<InspectionDoc> {
        new.validate()?;
        let mut doc = new.into_doc();
        doc.metadata = Metadata::new();
        let id = self.coll.insert_one(doc.clone()).await?;
        doc._id = Some(id);
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validation_rejects_unknown_impact_rating() {
        let mut new = NewInspection {
            application_id: "64f000000000000000000001".into(),
            inspector_id: "insp-1".into(),
            inspection_date: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            findings: InspectionFindings::default(),
        };
        assert!(new.validate().is_ok());

        new.findings.environmental_impact = "catastrophic".into();
        assert!(new.validate().is_err());
    }

    #[test]
    fn test_filter_matches_by_inspector() {
        let doc = NewInspection {
            application_id: "app-1".into(),
            inspector_id: "insp-1".into(),
            inspection_date: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            findings: InspectionFindings::default(),
        }
        .into_doc();

        let filter = InspectionFilter {
            inspector_id: Some("insp-1".into()),
            ..Default::default()
        };
        assert!(filter.matches(&doc));

        let other = InspectionFilter {
            inspector_id: Some("insp-2".into()),
            ..Default::default()
        };
        assert!(!other.matches(&doc));
    }
}

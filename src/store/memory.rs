//! In-memory store doubles for tests
//!
//! Implement the record traits over a mutex-held Vec so route and workflow
//! tests run without a live store. Filtering reuses the filters' predicate
//! form, so the doubles and the real queries agree by construction.

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use std::sync::Mutex;

use super::{
    applications::apply_status_change, ApplicationFilter, ApplicationPatch, ApplicationRecords,
    InspectionFilter, InspectionRecords, NewApplication, NewInspection, NewPermit, PermitFilter,
    PermitRecords, StatusChange,
};
use crate::db::schemas::{ApplicationDoc, InspectionDoc, Metadata, PermitDoc};
use crate::types::{Result, SluiceError};

#[derive(Default)]
pub struct InMemoryApplications {
    pub review_sla_days: i64,
    records: Mutex<Vec<ApplicationDoc>>,
}

impl InMemoryApplications {
    pub fn new(review_sla_days: i64) -> Self {
        Self {
            review_sla_days,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Seed a record directly, bypassing creation validation
    pub fn seed(&self, mut doc: ApplicationDoc) -> String {
        let id = ObjectId::new();
        doc._id = Some(id);
        if doc.metadata.created_at.is_none() {
            doc.metadata = Metadata::new();
        }
        self.records.lock().unwrap().push(doc);
        id.to_hex()
    }
}

fn by_created_desc(a: &Metadata, b: &Metadata) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at)
}

#[async_trait]
impl ApplicationRecords for InMemoryApplications {
    async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationDoc>> {
        let records = self.records.lock().unwrap();
        let mut out: Vec<ApplicationDoc> = records
            .iter()
            .filter(|app| !app.metadata.is_deleted && filter.matches(app))
            .cloned()
            .collect();
        out.sort_by(|a, b| by_created_desc(&a.metadata, &b.metadata));
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<ApplicationDoc> {
        let oid = super::parse_object_id(id)?;
        let records = self.records.lock().unwrap();
        records
            .iter()
            .find(|app| app._id == Some(oid) && !app.metadata.is_deleted)
            .cloned()
            .ok_or_else(|| SluiceError::NotFound(format!("application {id}")))
    }

    async fn create(&self, new: NewApplication) -> Result<ApplicationDoc> {
        new.validate()?;
        let mut doc = ApplicationDoc {
            applicant_id: new.applicant_id,
            application_type: new.application_type,
            water_source: new.water_source,
            water_purpose: new.water_purpose,
            location: new.location,
            project_title: new.project_title,
            project_description: new.project_description,
            usage_volume: new.usage_volume,
            usage_unit: new.usage_unit,
            project_value: new.project_value,
            application_number: ApplicationDoc::generate_number(2026),
            metadata: Metadata::new(),
            ..Default::default()
        };
        doc._id = Some(ObjectId::new());
        self.records.lock().unwrap().push(doc.clone());
        Ok(doc)
    }

    async fn update(&self, id: &str, patch: ApplicationPatch) -> Result<ApplicationDoc> {
        let oid = super::parse_object_id(id)?;
        if patch.is_empty() {
            return Err(SluiceError::Validation("empty update".into()));
        }
        let mut records = self.records.lock().unwrap();
        let app = records
            .iter_mut()
            .find(|app| app._id == Some(oid) && !app.metadata.is_deleted)
            .ok_or_else(|| SluiceError::NotFound(format!("application {id}")))?;
        patch.apply(app);
        Ok(app.clone())
    }

    async fn update_status(&self, id: &str, change: StatusChange) -> Result<ApplicationDoc> {
        let oid = super::parse_object_id(id)?;
        let mut records = self.records.lock().unwrap();
        let app = records
            .iter_mut()
            .find(|app| app._id == Some(oid) && !app.metadata.is_deleted)
            .ok_or_else(|| SluiceError::NotFound(format!("application {id}")))?;
        apply_status_change(app, &change, self.review_sla_days)?;
        Ok(app.clone())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let oid = super::parse_object_id(id)?;
        let mut records = self.records.lock().unwrap();
        let app = records
            .iter_mut()
            .find(|app| app._id == Some(oid) && !app.metadata.is_deleted)
            .ok_or_else(|| SluiceError::NotFound(format!("application {id}")))?;
        app.metadata.is_deleted = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPermits {
    records: Mutex<Vec<PermitDoc>>,
}

impl InMemoryPermits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, mut doc: PermitDoc) -> String {
        let id = ObjectId::new();
        doc._id = Some(id);
        if doc.metadata.created_at.is_none() {
            doc.metadata = Metadata::new();
        }
        self.records.lock().unwrap().push(doc);
        id.to_hex()
    }
}

#[async_trait]
impl PermitRecords for InMemoryPermits {
    async fn list(&self, filter: &PermitFilter) -> Result<Vec<PermitDoc>> {
        let records = self.records.lock().unwrap();
        let mut out: Vec<PermitDoc> = records
            .iter()
            .filter(|permit| !permit.metadata.is_deleted && filter.matches(permit))
            .cloned()
            .collect();
        out.sort_by(|a, b| by_created_desc(&a.metadata, &b.metadata));
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<PermitDoc> {
        let oid = super::parse_object_id(id)?;
        let records = self.records.lock().unwrap();
        records
            .iter()
            .find(|permit| permit._id == Some(oid) && !permit.metadata.is_deleted)
            .cloned()
            .ok_or_else(|| SluiceError::NotFound(format!("permit {id}")))
    }

    async fn create(&self, new: NewPermit) -> Result<PermitDoc> {
        new.validate()?;
        let mut doc = new.into_doc();
        doc.metadata = Metadata::new();
        doc._id = Some(ObjectId::new());
        self.records.lock().unwrap().push(doc.clone());
        Ok(doc)
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let oid = super::parse_object_id(id)?;
        let mut records = self.records.lock().unwrap();
        let permit = records
            .iter_mut()
            .find(|permit| permit._id == Some(oid) && !permit.metadata.is_deleted)
            .ok_or_else(|| SluiceError::NotFound(format!("permit {id}")))?;
        permit.metadata.is_deleted = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryInspections {
    records: Mutex<Vec<InspectionDoc>>,
}

impl InMemoryInspections {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InspectionRecords for InMemoryInspections {
    async fn list(&self, filter: &InspectionFilter) -> Result<Vec<InspectionDoc>> {
        let records = self.records.lock().unwrap();
        let mut out: Vec<InspectionDoc> = records
            .iter()
            .filter(|inspection| filter.matches(inspection))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.inspection_date.cmp(&a.inspection_date));
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<InspectionDoc> {
        let oid = super::parse_object_id(id)?;
        let records = self.records.lock().unwrap();
        records
            .iter()
            .find(|inspection| inspection._id == Some(oid))
            .cloned()
            .ok_or_else(|| SluiceError::NotFound(format!("inspection {id}")))
    }

    async fn create(&self, new: NewInspection) -> Result<InspectionDoc> {
        new.validate()?;
        let mut doc = new.into_doc();
        doc.metadata = Metadata::new();
        doc._id = Some(ObjectId::new());
        self.records.lock().unwrap().push(doc.clone());
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{ApplicationType, LocationRef};
    use crate::workflow::ApplicationStatus;

    fn new_application(applicant: &str) -> NewApplication {
        NewApplication {
            applicant_id: applicant.into(),
            application_type: ApplicationType::Irrigation,
            water_source: "Nyabarongo".into(),
            water_purpose: "irrigation".into(),
            location: LocationRef {
                province: "Kigali".into(),
                district: "Gasabo".into(),
                sector: "Remera".into(),
                cell: None,
                village: None,
            },
            project_title: "Drip irrigation scheme".into(),
            project_description: None,
            usage_volume: 40.0,
            usage_unit: "m3/day".into(),
            project_value: 10_000.0,
        }
    }

    #[tokio::test]
    async fn test_create_get_list() {
        let store = InMemoryApplications::new(30);
        let created = store.create(new_application("u-1")).await.unwrap();
        let id = created._id.unwrap().to_hex();

        let fetched = store.get(&id).await.unwrap();
        assert_eq!(fetched.applicant_id, "u-1");
        assert_eq!(fetched.status, ApplicationStatus::Draft);

        let all = store.list(&ApplicationFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_applicant() {
        let store = InMemoryApplications::new(30);
        store.create(new_application("u-1")).await.unwrap();
        store.create(new_application("u-2")).await.unwrap();

        let filter = ApplicationFilter {
            applicant_id: Some("u-1".into()),
            ..Default::default()
        };
        let mine = store.list(&filter).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].applicant_id, "u-1");
    }

    #[tokio::test]
    async fn test_update_status_enforces_lifecycle() {
        let store = InMemoryApplications::new(30);
        let created = store.create(new_application("u-1")).await.unwrap();
        let id = created._id.unwrap().to_hex();

        let err = store
            .update_status(
                &id,
                StatusChange {
                    next: ApplicationStatus::Approved,
                    reason: None,
                    now: Utc::now(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SluiceError::Validation(_)));

        let submitted = store
            .update_status(
                &id,
                StatusChange {
                    next: ApplicationStatus::Submitted,
                    reason: None,
                    now: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert_eq!(submitted.status, ApplicationStatus::Submitted);
        assert!(submitted.review_deadline.is_some());
    }

    #[tokio::test]
    async fn test_remove_hides_from_reads() {
        let store = InMemoryApplications::new(30);
        let created = store.create(new_application("u-1")).await.unwrap();
        let id = created._id.unwrap().to_hex();

        store.remove(&id).await.unwrap();
        assert!(matches!(
            store.get(&id).await.unwrap_err(),
            SluiceError::NotFound(_)
        ));
        assert!(store.list(&ApplicationFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = InMemoryApplications::new(30);
        let missing = ObjectId::new().to_hex();
        assert!(matches!(
            store.get(&missing).await.unwrap_err(),
            SluiceError::NotFound(_)
        ));
        assert!(matches!(
            store.get("not-an-id").await.unwrap_err(),
            SluiceError::BadRequest(_)
        ));
    }
}

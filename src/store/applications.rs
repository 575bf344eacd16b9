//! Application record store
//!
//! Mongo-backed implementation of [`ApplicationRecords`]. Status changes go
//! through [`apply_status_change`], which validates the lifecycle and stamps
//! the matching timestamps, so no caller can write an illegal transition.

use async_trait::async_trait;
use bson::{doc, DateTime as BsonDateTime, Document};
use chrono::{DateTime, Datelike, Duration, Utc};

use super::{parse_object_id, ApplicationFilter, ApplicationRecords};
use crate::db::schemas::{ApplicationDoc, ApplicationType, LocationRef, Metadata};
use crate::db::MongoCollection;
use crate::types::{Result, SluiceError};
use crate::workflow::{review_sla, ApplicationStatus};

/// Fields required to create a draft application
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub applicant_id: String,
    pub application_type: ApplicationType,
    pub water_source: String,
    pub water_purpose: String,
    pub location: LocationRef,
    pub project_title: String,
    pub project_description: Option<String>,
    pub usage_volume: f64,
    pub usage_unit: String,
    pub project_value: f64,
}

impl NewApplication {
    /// Basic field validation, before any store round-trip
    pub fn validate(&self) -> Result<()> {
        if self.applicant_id.is_empty() {
            return Err(SluiceError::Validation("applicant_id is required".into()));
        }
        if self.project_title.trim().is_empty() {
            return Err(SluiceError::Validation("project_title is required".into()));
        }
        if self.water_source.trim().is_empty() {
            return Err(SluiceError::Validation("water_source is required".into()));
        }
        if self.location.province.trim().is_empty() || self.location.district.trim().is_empty() {
            return Err(SluiceError::Validation(
                "location requires at least province and district".into(),
            ));
        }
        if self.usage_volume <= 0.0 {
            return Err(SluiceError::Validation(
                "usage_volume must be positive".into(),
            ));
        }
        Ok(())
    }

    fn into_doc(self, now: DateTime<Utc>) -> ApplicationDoc {
        ApplicationDoc {
            application_number: ApplicationDoc::generate_number(now.year()),
            applicant_id: self.applicant_id,
            application_type: self.application_type,
            water_source: self.water_source,
            water_purpose: self.water_purpose,
            location: self.location,
            project_title: self.project_title,
            project_description: self.project_description,
            usage_volume: self.usage_volume,
            usage_unit: self.usage_unit,
            project_value: self.project_value,
            status: ApplicationStatus::Draft,
            ..Default::default()
        }
    }
}

/// Partial update of editable application fields
#[derive(Debug, Clone, Default)]
pub struct ApplicationPatch {
    pub water_source: Option<String>,
    pub water_purpose: Option<String>,
    pub project_title: Option<String>,
    pub project_description: Option<String>,
    pub usage_volume: Option<f64>,
    pub usage_unit: Option<String>,
    pub project_value: Option<f64>,
    pub assigned_reviewer: Option<String>,
    pub assigned_inspector: Option<String>,
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        self.to_set_document().is_empty()
    }

    fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(v) = &self.water_source {
            set.insert("water_source", v.clone());
        }
        if let Some(v) = &self.water_purpose {
            set.insert("water_purpose", v.clone());
        }
        if let Some(v) = &self.project_title {
            set.insert("project_title", v.clone());
        }
        if let Some(v) = &self.project_description {
            set.insert("project_description", v.clone());
        }
        if let Some(v) = self.usage_volume {
            set.insert("usage_volume", v);
        }
        if let Some(v) = &self.usage_unit {
            set.insert("usage_unit", v.clone());
        }
        if let Some(v) = self.project_value {
            set.insert("project_value", v);
        }
        if let Some(v) = &self.assigned_reviewer {
            set.insert("assigned_reviewer", v.clone());
        }
        if let Some(v) = &self.assigned_inspector {
            set.insert("assigned_inspector", v.clone());
        }
        set
    }

    /// Apply the patch in place (in-memory double)
    pub(crate) fn apply(&self, app: &mut ApplicationDoc) {
        if let Some(v) = &self.water_source {
            app.water_source = v.clone();
        }
        if let Some(v) = &self.water_purpose {
            app.water_purpose = v.clone();
        }
        if let Some(v) = &self.project_title {
            app.project_title = v.clone();
        }
        if let Some(v) = &self.project_description {
            app.project_description = Some(v.clone());
        }
        if let Some(v) = self.usage_volume {
            app.usage_volume = v;
        }
        if let Some(v) = &self.usage_unit {
            app.usage_unit = v.clone();
        }
        if let Some(v) = self.project_value {
            app.project_value = v;
        }
        if let Some(v) = &self.assigned_reviewer {
            app.assigned_reviewer = Some(v.clone());
        }
        if let Some(v) = &self.assigned_inspector {
            app.assigned_inspector = Some(v.clone());
        }
    }
}

/// A requested lifecycle transition
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub next: ApplicationStatus,
    /// Required when rejecting
    pub reason: Option<String>,
    pub now: DateTime<Utc>,
}

/// Validate and apply a status change to a record in place.
///
/// Stamps submitted_at/reviewed_at/approved_at, sets the review deadline at
/// submission, and recomputes the SLA snapshot.
pub fn apply_status_change(
    app: &mut ApplicationDoc,
    change: &StatusChange,
    review_sla_days: i64,
) -> Result<()> {
    if !app.status.can_transition_to(change.next) {
        return Err(SluiceError::Validation(format!(
            "illegal status transition: {} -> {}",
            app.status, change.next
        )));
    }

    if change.next == ApplicationStatus::Rejected
        && change.reason.as_deref().map_or(true, |r| r.trim().is_empty())
    {
        return Err(SluiceError::Validation(
            "a rejection requires a reason".into(),
        ));
    }

    let now_bson = BsonDateTime::from_chrono(change.now);

    app.status = change.next;
    match change.next {
        ApplicationStatus::Submitted => {
            app.submitted_at = Some(now_bson);
            app.review_deadline =
                Some(BsonDateTime::from_chrono(change.now + Duration::days(review_sla_days)));
        }
        ApplicationStatus::UnderReview => {
            app.reviewed_at = Some(now_bson);
        }
        ApplicationStatus::Approved => {
            app.approved_at = Some(now_bson);
        }
        ApplicationStatus::Rejected => {
            app.rejection_reason = change.reason.clone();
        }
        _ => {}
    }

    app.sla_status = review_sla(change.now, app.review_deadline.map(|d| d.to_chrono()));
    Ok(())
}

/// Mongo-backed application store
pub struct MongoApplicationStore {
    coll: MongoCollection<ApplicationDoc>,
    review_sla_days: i64,
}

impl MongoApplicationStore {
    pub fn new(coll: MongoCollection<ApplicationDoc>, review_sla_days: i64) -> Self {
        Self {
            coll,
            review_sla_days,
        }
    }
}

#[async_trait]
impl ApplicationRecords for MongoApplicationStore {
    async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationDoc>> {
        self.coll
            .find_many(filter.to_document(), Some(doc! { "metadata.created_at": -1 }))
            .await
    }

    async fn get(&self, id: &str) -> Result<ApplicationDoc> {
        let oid = parse_object_id(id)?;
        self.coll
            .find_by_id(oid)
            .await?
            .ok_or_else(|| SluiceError::NotFound(format!("application {id}")))
    }

    async fn create(&self, new: NewApplication) -> Result<ApplicationDoc> {
        new.validate()?;
        let mut doc = new.into_doc(Utc::now());
        doc.metadata = Metadata::new();
        let id = self.coll.insert_one(doc.clone()).await?;
        doc._id = Some(id);
        Ok(doc)
    }

    async fn update(&self, id: &str, patch: ApplicationPatch) -> Result<ApplicationDoc> {
        let oid = parse_object_id(id)?;
        let set = patch.to_set_document();
        if set.is_empty() {
            return Err(SluiceError::Validation("empty update".into()));
        }

        let result = self
            .coll
            .update_one(doc! { "_id": oid }, doc! { "$set": set })
            .await?;
        if result.matched_count == 0 {
            return Err(SluiceError::NotFound(format!("application {id}")));
        }

        self.get(id).await
    }

    async fn update_status(&self, id: &str, change: StatusChange) -> Result<ApplicationDoc> {
        let mut app = self.get(id).await?;
        apply_status_change(&mut app, &change, self.review_sla_days)?;

        let mut set = doc! {
            "status": app.status.as_str(),
            "sla_status": app.sla_status.as_str(),
        };
        if let Some(v) = app.submitted_at {
            set.insert("submitted_at", v);
        }
        if let Some(v) = app.reviewed_at {
            set.insert("reviewed_at", v);
        }
        if let Some(v) = app.approved_at {
            set.insert("approved_at", v);
        }
        if let Some(v) = app.review_deadline {
            set.insert("review_deadline", v);
        }
        if let Some(v) = &app.rejection_reason {
            set.insert("rejection_reason", v.clone());
        }

        let oid = parse_object_id(id)?;
        self.coll
            .update_one(doc! { "_id": oid }, doc! { "$set": set })
            .await?;
        Ok(app)
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let oid = parse_object_id(id)?;
        let result = self.coll.soft_delete(doc! { "_id": oid }).await?;
        if result.matched_count == 0 {
            return Err(SluiceError::NotFound(format!("application {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    fn draft() -> ApplicationDoc {
        ApplicationDoc {
            applicant_id: "u-1".into(),
            status: ApplicationStatus::Draft,
            ..Default::default()
        }
    }

    #[test]
    fn test_submission_stamps_deadline() {
        let mut app = draft();
        let change = StatusChange {
            next: ApplicationStatus::Submitted,
            reason: None,
            now: at(2026, 3, 1),
        };
        apply_status_change(&mut app, &change, 30).unwrap();

        assert_eq!(app.status, ApplicationStatus::Submitted);
        assert_eq!(app.submitted_at.unwrap().to_chrono(), at(2026, 3, 1));
        assert_eq!(app.review_deadline.unwrap().to_chrono(), at(2026, 3, 31));
        assert_eq!(app.sla_status.as_str(), "on_time");
    }

    #[test]
    fn test_overdue_snapshot_after_deadline() {
        let mut app = draft();
        apply_status_change(
            &mut app,
            &StatusChange {
                next: ApplicationStatus::Submitted,
                reason: None,
                now: at(2026, 1, 1),
            },
            30,
        )
        .unwrap();

        // Reviewed long after the deadline
        apply_status_change(
            &mut app,
            &StatusChange {
                next: ApplicationStatus::UnderReview,
                reason: None,
                now: at(2026, 4, 1),
            },
            30,
        )
        .unwrap();
        assert_eq!(app.sla_status.as_str(), "overdue");
        assert!(app.reviewed_at.is_some());
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut app = draft();
        let err = apply_status_change(
            &mut app,
            &StatusChange {
                next: ApplicationStatus::Approved,
                reason: None,
                now: at(2026, 3, 1),
            },
            30,
        )
        .unwrap_err();
        assert!(matches!(err, SluiceError::Validation(_)));
        // Record untouched on failure
        assert_eq!(app.status, ApplicationStatus::Draft);
        assert!(app.approved_at.is_none());
    }

    #[test]
    fn test_rejection_requires_reason() {
        let mut app = draft();
        app.status = ApplicationStatus::UnderReview;

        let err = apply_status_change(
            &mut app,
            &StatusChange {
                next: ApplicationStatus::Rejected,
                reason: None,
                now: at(2026, 3, 1),
            },
            30,
        )
        .unwrap_err();
        assert!(matches!(err, SluiceError::Validation(_)));

        apply_status_change(
            &mut app,
            &StatusChange {
                next: ApplicationStatus::Rejected,
                reason: Some("incomplete hydrology study".into()),
                now: at(2026, 3, 1),
            },
            30,
        )
        .unwrap();
        assert_eq!(app.rejection_reason.as_deref(), Some("incomplete hydrology study"));
    }

    #[test]
    fn test_new_application_validation() {
        let mut new = NewApplication {
            applicant_id: "u-1".into(),
            application_type: ApplicationType::SurfaceWater,
            water_source: "Lake Muhazi".into(),
            water_purpose: "irrigation".into(),
            location: LocationRef {
                province: "Eastern".into(),
                district: "Rwamagana".into(),
                sector: "Muhazi".into(),
                cell: None,
                village: None,
            },
            project_title: "Rice scheme intake".into(),
            project_description: None,
            usage_volume: 120.0,
            usage_unit: "m3/day".into(),
            project_value: 50_000.0,
        };
        assert!(new.validate().is_ok());

        new.usage_volume = 0.0;
        assert!(new.validate().is_err());
    }
}

//! Permit record store
//!
//! Permits are immutable once issued apart from soft deletion; the
//! active/expiring/expired classification is derived at read time from
//! `expiry_date`, never written back.

use async_trait::async_trait;
use bson::{doc, DateTime as BsonDateTime, Document};
use chrono::{DateTime, Datelike, Utc};

use super::{parse_object_id, PermitRecords};
use crate::db::schemas::{Metadata, PermitDoc};
use crate::db::MongoCollection;
use crate::types::{Result, SluiceError};

/// Filters for listing permits
#[derive(Debug, Clone, Default)]
pub struct PermitFilter {
    pub holder_id: Option<String>,
    pub application_id: Option<String>,
}

impl PermitFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(holder) = &self.holder_id {
            filter.insert("holder_id", holder.clone());
        }
        if let Some(application) = &self.application_id {
            filter.insert("application_id", application.clone());
        }
        filter
    }

    /// Predicate form, used by the in-memory double
    pub fn matches(&self, permit: &PermitDoc) -> bool {
        if let Some(holder) = &self.holder_id {
            if &permit.holder_id != holder {
                return false;
            }
        }
        if let Some(application) = &self.application_id {
            if &permit.application_id != application {
                return false;
            }
        }
        true
    }
}

/// Fields required to issue a permit
#[derive(Debug, Clone)]
pub struct NewPermit {
    pub application_id: String,
    pub holder_id: String,
    pub purpose: String,
    pub issued_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub conditions: Vec<String>,
    /// Sequence number for the human-facing permit number
    pub sequence: u32,
}

impl NewPermit {
    pub fn validate(&self) -> Result<()> {
        if self.application_id.is_empty() || self.holder_id.is_empty() {
            return Err(SluiceError::Validation(
                "application_id and holder_id are required".into(),
            ));
        }
        if self.expiry_date <= self.issued_date {
            return Err(SluiceError::Validation(
                "expiry_date must come after issued_date".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn into_doc(self) -> PermitDoc {
        PermitDoc {
            permit_number: PermitDoc::generate_number(self.issued_date.year(), self.sequence),
            application_id: self.application_id,
            holder_id: self.holder_id,
            purpose: self.purpose,
            issued_date: BsonDateTime::from_chrono(self.issued_date),
            expiry_date: BsonDateTime::from_chrono(self.expiry_date),
            conditions: self.conditions,
            ..Default::default()
        }
    }
}

/// Mongo-backed permit store
pub struct MongoPermitStore {
    coll: MongoCollection<PermitDoc>,
}

impl MongoPermitStore {
    pub fn new(coll: MongoCollection<PermitDoc>) -> Self {
        Self { coll }
    }
}

#[async_trait]
impl PermitRecords for MongoPermitStore {
    async fn list(&self, filter: &PermitFilter) -> Result<Vec<PermitDoc>> {
        self.coll
            .find_many(filter.to_document(), Some(doc! { "metadata.created_at": -1 }))
            .await
    }

    async fn get(&self, id: &str) -> Result<PermitDoc> {
        let oid = parse_object_id(id)?;
        self.coll
            .find_by_id(oid)
            .await?
            .ok_or_else(|| SluiceError::NotFound(format!("permit {id}")))
    }

    async fn create(&self, new: NewPermit) -> Result<PermitDoc> {
        new.validate()?;
        let mut doc = new.into_doc();
        doc.metadata = Metadata::new();
        let id = self.coll.insert_one(doc.clone()).await?;
        doc._id = Some(id);
        Ok(doc)
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let oid = parse_object_id(id)?;
        let result = self.coll.soft_delete(doc! { "_id": oid }).await?;
        if result.matched_count == 0 {
            return Err(SluiceError::NotFound(format!("permit {id}")));
        }
        Ok(())
    }
}

//! Record lifecycle metadata
//!
//! Every portal collection carries the same envelope: creation and update
//! timestamps plus a soft-delete marker. Permit records are never hard
//! deleted; reads filter on `is_deleted` instead.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Lifecycle envelope embedded in every stored document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// Soft-delete marker checked by every read
    #[serde(default)]
    pub is_deleted: bool,

    /// When the record was soft-deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    /// When the record was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    /// When the record was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Fresh envelope stamped with the current time
    pub fn new() -> Self {
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(DateTime::now()),
            created_at: Some(DateTime::now()),
        }
    }
}

//! Represents one catalogued item with an optional attached picture.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::UserSummary;

/// Placeholder label substituted when an upload carries no name.
pub const NAME_PLACEHOLDER: &str = "Untitled";

/// A metadata record describing a catalogued image item.
///
/// The binary payload itself lives in the object store; `image_url` holds the
/// durable locator returned when the blob was written, or an empty string for
/// records created without a picture.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ImageRecord {
    /// Unique identifier, assigned at creation.
    pub id: Uuid,

    /// Text label. An absent label is stored as the placeholder.
    pub name: String,

    /// Free-form description.
    pub description: String,

    /// Non-negative monetary value.
    pub value: f64,

    /// Non-negative stock count; the only field mutable after creation.
    pub quantity: i64,

    /// Durable locator of the stored blob, empty when no picture is attached.
    pub image_url: String,

    /// Account that created the record, when uploaded by a known user.
    pub uploaded_by: Option<Uuid>,

    /// Set by the store at insert.
    pub created_at: DateTime<Utc>,

    /// Set by the store on every mutation.
    pub updated_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Locator of the stored blob. Always identical to `image_url`.
    pub fn url(&self) -> &str {
        &self.image_url
    }
}

/// Wire representation of a record.
///
/// Serializes both `imageUrl` and `url` from the same stored field so every
/// reader observes them as equal (including the empty-string case), and
/// expands the owner when one is attached.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub value: f64,
    pub quantity: i64,
    pub image_url: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImageResponse {
    /// Build the wire shape from a record and its (optional) owner.
    pub fn from_record(record: ImageRecord, owner: Option<UserSummary>) -> Self {
        let url = record.url().to_string();
        let name = if record.name.trim().is_empty() {
            NAME_PLACEHOLDER.to_string()
        } else {
            record.name
        };
        Self {
            id: record.id,
            name,
            description: record.description,
            value: record.value,
            quantity: record.quantity,
            url,
            image_url: record.image_url,
            uploaded_by: owner,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Outcome of the bulk clear operation.
///
/// The bulk clear never aborts mid-batch; this payload is the only channel
/// reporting which records could not be fully cleaned up.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClearAllReport {
    pub total: usize,
    pub deleted_from_blob_store: usize,
    pub deleted_from_metadata_store: usize,
    pub errors: Vec<ClearAllError>,
}

/// One record the bulk clear could not fully clean up.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClearAllError {
    pub id: Uuid,
    pub error: String,
}

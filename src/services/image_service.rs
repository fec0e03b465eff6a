//! The image lifecycle service.
//!
//! The single place that coordinates transcoding, blob placement, and
//! metadata persistence, and that guarantees the `url`/`imageUrl`
//! equivalence on every record it returns. Blob and record deletion are
//! deliberately not atomic: the metadata store is authoritative, and a
//! failed blob removal is logged and swallowed rather than blocking the
//! record delete.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    models::{
        image::{ClearAllError, ClearAllReport, ImageRecord, ImageResponse},
        user::{Identity, UserSummary},
    },
    services::{
        object_store::{ObjectStore, StoreError},
        transcoder::{self, TranscodeError},
    },
};
use bytes::Bytes;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),
    #[error("image re-encoding failed: {0}")]
    Transcode(String),
    #[error("blob storage failure: {0}")]
    Storage(#[from] StoreError),
    #[error("record not found")]
    NotFound,
    #[error("not allowed to perform this operation")]
    Forbidden,
    #[error("authentication required")]
    Unauthorized,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<TranscodeError> for CatalogError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::UnsupportedMediaKind(kind) => CatalogError::UnsupportedMedia(kind),
            TranscodeError::TooLarge(_) => CatalogError::InvalidInput(err.to_string()),
            TranscodeError::TranscodeFailure(msg) => CatalogError::Transcode(msg),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Text fields of an upload request.
#[derive(Debug, Default, Clone)]
pub struct UploadFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: Option<String>,
}

/// Binary payload of an upload request, with its declared content type.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Bytes,
    pub content_type: String,
}

const RECORD_COLUMNS: &str =
    "id, name, description, value, quantity, image_url, uploaded_by, created_at, updated_at";

/// Flat row shape for record + owner join queries.
#[derive(FromRow)]
struct RecordWithOwnerRow {
    id: Uuid,
    name: String,
    description: String,
    value: f64,
    quantity: i64,
    image_url: String,
    uploaded_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner_name: Option<String>,
    owner_email: Option<String>,
}

impl RecordWithOwnerRow {
    fn into_response(self) -> ImageResponse {
        let owner = match (self.uploaded_by, self.owner_name, self.owner_email) {
            (Some(id), Some(name), Some(email)) => Some(UserSummary { id, name, email }),
            _ => None,
        };
        let record = ImageRecord {
            id: self.id,
            name: self.name,
            description: self.description,
            value: self.value,
            quantity: self.quantity,
            image_url: self.image_url,
            uploaded_by: self.uploaded_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        ImageResponse::from_record(record, owner)
    }
}

const RECORD_WITH_OWNER_QUERY: &str = "SELECT i.id, i.name, i.description, i.value, i.quantity, \
     i.image_url, i.uploaded_by, i.created_at, i.updated_at, \
     u.name AS owner_name, u.email AS owner_email \
     FROM images i LEFT JOIN users u ON u.id = i.uploaded_by";

/// ImageService coordinates the full lifecycle of a catalogued image:
/// - Upload (transcode, place blob, persist metadata — in that order)
/// - Listing and lookup with owner expansion
/// - Quantity updates
/// - Coordinated deletion (best-effort blob removal, authoritative record
///   removal) and the admin bulk clear
#[derive(Clone)]
pub struct ImageService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    store: Arc<dyn ObjectStore>,
    require_owner: bool,
}

impl ImageService {
    pub fn new(db: Arc<SqlitePool>, store: Arc<dyn ObjectStore>, require_owner: bool) -> Self {
        Self {
            db,
            store,
            require_owner,
        }
    }

    /// Derive a collision-resistant storage key for a new blob.
    ///
    /// Time-based prefix plus a random suffix; concurrent uploads never
    /// contend on a fixed name.
    fn generate_key() -> String {
        format!(
            "image-{}-{}.jpeg",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        )
    }

    fn parse_value(raw: Option<&str>) -> CatalogResult<f64> {
        let raw = raw
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CatalogError::InvalidInput("value is required".into()))?;
        let value: f64 = raw
            .parse()
            .map_err(|_| CatalogError::InvalidInput(format!("value `{raw}` is not a number")))?;
        if !value.is_finite() || value < 0.0 {
            return Err(CatalogError::InvalidInput(
                "value must be a non-negative number".into(),
            ));
        }
        Ok(value)
    }

    /// Create a record, transcoding and storing the attached picture first.
    ///
    /// The blob write happens before the metadata insert, never the reverse:
    /// a failure in the transcode or blob path leaves no record behind, and a
    /// record is only ever persisted with a locator the store confirmed.
    pub async fn upload(
        &self,
        fields: UploadFields,
        file: Option<UploadedFile>,
        actor: Option<&Identity>,
    ) -> CatalogResult<ImageResponse> {
        let value = Self::parse_value(fields.value.as_deref())?;
        if self.require_owner && actor.is_none() {
            return Err(CatalogError::Unauthorized);
        }

        let name = fields
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| crate::models::image::NAME_PLACEHOLDER.to_string());
        let description = fields.description.unwrap_or_default();

        let image_url = match file {
            Some(UploadedFile {
                bytes,
                content_type,
            }) => {
                let original_size = bytes.len();
                let encoded = tokio::task::spawn_blocking(move || {
                    transcoder::transcode_to_jpeg(&bytes, &content_type)
                })
                .await
                .map_err(|err| CatalogError::Transcode(format!("encoder task failed: {err}")))??;

                debug!(
                    original_size,
                    encoded_size = encoded.len(),
                    "transcoded upload payload"
                );

                let key = Self::generate_key();
                self.store
                    .put(&key, encoded, transcoder::OUTPUT_CONTENT_TYPE)
                    .await?
            }
            None => String::new(),
        };

        let now = Utc::now();
        let record = sqlx::query_as::<_, ImageRecord>(
            "INSERT INTO images (id, name, description, value, quantity, image_url, uploaded_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?) \
             RETURNING id, name, description, value, quantity, image_url, uploaded_by, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(&description)
        .bind(value)
        .bind(&image_url)
        .bind(actor.map(|a| a.id))
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?;

        info!(id = %record.id, name = %record.name, has_blob = !record.image_url.is_empty(), "created image record");

        let owner = match record.uploaded_by {
            Some(owner_id) => self.owner_summary(owner_id).await?,
            None => None,
        };
        Ok(ImageResponse::from_record(record, owner))
    }

    /// All records, owner expanded, newest first. A finite snapshot with no
    /// side effects.
    pub async fn list(&self) -> CatalogResult<Vec<ImageResponse>> {
        let rows = sqlx::query_as::<_, RecordWithOwnerRow>(&format!(
            "{RECORD_WITH_OWNER_QUERY} ORDER BY i.created_at DESC"
        ))
        .fetch_all(&*self.db)
        .await?;

        debug!(count = rows.len(), "listed image records");
        Ok(rows.into_iter().map(RecordWithOwnerRow::into_response).collect())
    }

    /// Fetch a single record with its owner expanded.
    pub async fn get(&self, id: Uuid) -> CatalogResult<ImageResponse> {
        let row = sqlx::query_as::<_, RecordWithOwnerRow>(&format!(
            "{RECORD_WITH_OWNER_QUERY} WHERE i.id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(CatalogError::NotFound)?;

        Ok(row.into_response())
    }

    /// Set the stock count of a record. Validates before any store mutation;
    /// mutates only `quantity` (and `updated_at`).
    pub async fn update_quantity(&self, id: Uuid, quantity: i64) -> CatalogResult<ImageResponse> {
        if quantity < 0 {
            return Err(CatalogError::InvalidInput(
                "quantity must be a non-negative number".into(),
            ));
        }

        let result = sqlx::query("UPDATE images SET quantity = ?, updated_at = ? WHERE id = ?")
            .bind(quantity)
            .bind(Utc::now())
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }

        self.get(id).await
    }

    /// Delete a record and, best-effort, its stored blob.
    ///
    /// Ownership rules: a record without an owner may only be deleted by an
    /// admin; an owned record by an admin or its owner. The blob removal is a
    /// compensating action — its failure is logged, never surfaced, and never
    /// blocks the authoritative record removal.
    pub async fn delete(&self, id: Uuid, actor: &Identity) -> CatalogResult<()> {
        let record = self.fetch_record(id).await?;

        match record.uploaded_by {
            None => {
                if !actor.is_admin() {
                    return Err(CatalogError::Forbidden);
                }
            }
            Some(owner_id) => {
                if !actor.is_admin() && owner_id != actor.id {
                    return Err(CatalogError::Forbidden);
                }
            }
        }

        if !record.image_url.is_empty() {
            if let Err(err) = self.store.delete(&record.image_url).await {
                warn!(id = %id, locator = %record.image_url, "blob delete failed, removing record anyway: {err}");
            }
        }

        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }

        info!(id = %id, "deleted image record");
        Ok(())
    }

    /// Remove every record and its blob. Admin only.
    ///
    /// Each record is processed exactly once with per-record fault isolation:
    /// a blob failure is appended to the report and the metadata delete still
    /// runs. There is no rollback; the report is the sole channel surfacing
    /// partial failures, and re-invoking the operation is safe.
    pub async fn clear_all(&self, actor: &Identity) -> CatalogResult<ClearAllReport> {
        if !actor.is_admin() {
            return Err(CatalogError::Forbidden);
        }

        let records = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM images ORDER BY created_at DESC"
        ))
        .fetch_all(&*self.db)
        .await?;

        let mut report = ClearAllReport {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            if !record.image_url.is_empty() {
                match self.store.delete(&record.image_url).await {
                    Ok(()) => report.deleted_from_blob_store += 1,
                    Err(err) => report.errors.push(ClearAllError {
                        id: record.id,
                        error: format!("blob delete failed: {err}"),
                    }),
                }
            }

            match sqlx::query("DELETE FROM images WHERE id = ?")
                .bind(record.id)
                .execute(&*self.db)
                .await
            {
                Ok(result) if result.rows_affected() > 0 => {
                    report.deleted_from_metadata_store += 1
                }
                Ok(_) => report.errors.push(ClearAllError {
                    id: record.id,
                    error: "record no longer present".into(),
                }),
                Err(err) => report.errors.push(ClearAllError {
                    id: record.id,
                    error: format!("record delete failed: {err}"),
                }),
            }
        }

        info!(
            total = report.total,
            blobs = report.deleted_from_blob_store,
            records = report.deleted_from_metadata_store,
            errors = report.errors.len(),
            "bulk clear finished"
        );
        Ok(report)
    }

    async fn fetch_record(&self, id: Uuid) -> CatalogResult<ImageRecord> {
        sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM images WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(CatalogError::NotFound)
    }

    async fn owner_summary(&self, id: Uuid) -> CatalogResult<Option<UserSummary>> {
        let owner = sqlx::query_as::<_, UserSummary>("SELECT id, name, email FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::Role,
        services::object_store::{StoreResult, ObjectStore},
    };
    use async_trait::async_trait;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::{
        io::Cursor,
        sync::{
            Mutex,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    };

    /// In-process store double recording calls, with injectable failures.
    #[derive(Default)]
    struct RecordingStore {
        puts: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
        fail_put: AtomicBool,
        fail_delete: AtomicBool,
    }

    impl RecordingStore {
        fn put_count(&self) -> usize {
            self.puts.lock().unwrap().len()
        }

        fn delete_count(&self) -> usize {
            self.deletes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn put(&self, key: &str, _bytes: Bytes, _content_type: &str) -> StoreResult<String> {
            if self.fail_put.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("injected put failure")));
            }
            self.puts.lock().unwrap().push(key.to_string());
            Ok(format!("http://blobs.test/{key}"))
        }

        async fn delete(&self, locator: &str) -> StoreResult<()> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other(
                    "injected delete failure",
                )));
            }
            self.deletes.lock().unwrap().push(locator.to_string());
            Ok(())
        }
    }

    async fn test_db() -> Arc<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        for stmt in include_str!("../../migrations/0001_init.sql")
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(stmt).execute(&pool).await.unwrap();
        }
        Arc::new(pool)
    }

    async fn test_service(require_owner: bool) -> (ImageService, Arc<RecordingStore>) {
        let db = test_db().await;
        let store = Arc::new(RecordingStore::default());
        (
            ImageService::new(db, store.clone(), require_owner),
            store,
        )
    }

    async fn seed_user(db: &SqlitePool, role: Role) -> Identity {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind("Tester")
        .bind(format!("{id}@example.com"))
        .bind("unused")
        .bind(role)
        .bind(Utc::now())
        .execute(db)
        .await
        .unwrap();
        Identity { id, role }
    }

    fn jpeg_file() -> UploadedFile {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([10, 200, 40])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Jpeg(90)).unwrap();
        UploadedFile {
            bytes: Bytes::from(out.into_inner()),
            content_type: "image/jpeg".to_string(),
        }
    }

    fn chair_fields() -> UploadFields {
        UploadFields {
            name: Some("Chair".into()),
            description: None,
            value: Some("19.99".into()),
        }
    }

    async fn record_count(db: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upload_without_file_creates_metadata_only_record() {
        let (service, store) = test_service(false).await;

        let record = service.upload(chair_fields(), None, None).await.unwrap();

        assert_eq!(record.name, "Chair");
        assert_eq!(record.value, 19.99);
        assert_eq!(record.quantity, 0);
        assert_eq!(record.image_url, "");
        assert_eq!(record.url, record.image_url);
        assert!(record.uploaded_by.is_none());
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn upload_with_file_places_blob_then_record() {
        let (service, store) = test_service(false).await;

        let record = service
            .upload(chair_fields(), Some(jpeg_file()), None)
            .await
            .unwrap();

        assert_eq!(store.put_count(), 1);
        let key = store.puts.lock().unwrap()[0].clone();
        assert!(key.starts_with("image-"));
        assert!(key.ends_with(".jpeg"));
        assert_eq!(record.image_url, format!("http://blobs.test/{key}"));
        assert_eq!(record.url, record.image_url);
    }

    #[tokio::test]
    async fn upload_rejects_disallowed_media_without_side_effects() {
        let (service, store) = test_service(false).await;

        let file = UploadedFile {
            bytes: Bytes::from_static(b"plain text"),
            content_type: "text/plain".to_string(),
        };
        let result = service.upload(chair_fields(), Some(file), None).await;

        assert!(matches!(result, Err(CatalogError::UnsupportedMedia(_))));
        assert_eq!(store.put_count(), 0);
        assert_eq!(record_count(&service.db).await, 0);
    }

    #[tokio::test]
    async fn upload_storage_failure_leaves_no_record() {
        let (service, store) = test_service(false).await;
        store.fail_put.store(true, Ordering::SeqCst);

        let result = service.upload(chair_fields(), Some(jpeg_file()), None).await;

        assert!(matches!(result, Err(CatalogError::Storage(_))));
        assert_eq!(record_count(&service.db).await, 0);
    }

    #[tokio::test]
    async fn upload_rejects_missing_or_negative_value() {
        let (service, _store) = test_service(false).await;

        let missing = UploadFields {
            name: Some("Chair".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.upload(missing, None, None).await,
            Err(CatalogError::InvalidInput(_))
        ));

        let negative = UploadFields {
            value: Some("-1".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.upload(negative, None, None).await,
            Err(CatalogError::InvalidInput(_))
        ));

        assert_eq!(record_count(&service.db).await, 0);
    }

    #[tokio::test]
    async fn upload_defaults_name_and_description() {
        let (service, _store) = test_service(false).await;

        let fields = UploadFields {
            name: Some("   ".into()),
            description: None,
            value: Some("0".into()),
        };
        let record = service.upload(fields, None, None).await.unwrap();

        assert_eq!(record.name, "Untitled");
        assert_eq!(record.description, "");
        assert_eq!(record.value, 0.0);
    }

    #[tokio::test]
    async fn upload_honors_owner_requirement() {
        let (service, _store) = test_service(true).await;

        let result = service.upload(chair_fields(), None, None).await;
        assert!(matches!(result, Err(CatalogError::Unauthorized)));

        let actor = seed_user(&service.db, Role::User).await;
        let record = service
            .upload(chair_fields(), None, Some(&actor))
            .await
            .unwrap();
        let owner = record.uploaded_by.unwrap();
        assert_eq!(owner.id, actor.id);
        assert_eq!(owner.name, "Tester");
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let (service, _store) = test_service(false).await;

        let mut ids = Vec::new();
        for name in ["first", "second", "third"] {
            let fields = UploadFields {
                name: Some(name.into()),
                description: None,
                value: Some("1".into()),
            };
            ids.push(service.upload(fields, None, None).await.unwrap().id);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].id, ids[2]);
        assert_eq!(listed[2].id, ids[0]);
        for record in &listed {
            assert_eq!(record.url, record.image_url);
        }
    }

    #[tokio::test]
    async fn get_missing_record_is_not_found() {
        let (service, _store) = test_service(false).await;
        assert!(matches!(
            service.get(Uuid::new_v4()).await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn update_quantity_validates_before_mutating() {
        let (service, _store) = test_service(false).await;
        let id = service.upload(chair_fields(), None, None).await.unwrap().id;

        assert!(matches!(
            service.update_quantity(id, -1).await,
            Err(CatalogError::InvalidInput(_))
        ));
        assert_eq!(service.get(id).await.unwrap().quantity, 0);

        let updated = service.update_quantity(id, 7).await.unwrap();
        assert_eq!(updated.quantity, 7);
        assert_eq!(updated.name, "Chair");

        assert!(matches!(
            service.update_quantity(Uuid::new_v4(), 1).await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_enforces_ownership_and_is_idempotent() {
        let (service, _store) = test_service(false).await;
        let owner = seed_user(&service.db, Role::User).await;
        let other = seed_user(&service.db, Role::User).await;

        let id = service
            .upload(chair_fields(), None, Some(&owner))
            .await
            .unwrap()
            .id;

        assert!(matches!(
            service.delete(id, &other).await,
            Err(CatalogError::Forbidden)
        ));
        assert!(service.get(id).await.is_ok());

        service.delete(id, &owner).await.unwrap();
        assert!(matches!(
            service.delete(id, &owner).await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn ownerless_record_is_admin_delete_only() {
        let (service, _store) = test_service(false).await;
        let user = seed_user(&service.db, Role::User).await;
        let admin = seed_user(&service.db, Role::Admin).await;

        let id = service.upload(chair_fields(), None, None).await.unwrap().id;

        assert!(matches!(
            service.delete(id, &user).await,
            Err(CatalogError::Forbidden)
        ));
        service.delete(id, &admin).await.unwrap();
    }

    #[tokio::test]
    async fn delete_swallows_blob_failure_and_removes_record() {
        let (service, store) = test_service(false).await;
        let admin = seed_user(&service.db, Role::Admin).await;

        let id = service
            .upload(chair_fields(), Some(jpeg_file()), None)
            .await
            .unwrap()
            .id;
        store.fail_delete.store(true, Ordering::SeqCst);

        service.delete(id, &admin).await.unwrap();
        assert_eq!(record_count(&service.db).await, 0);
    }

    #[tokio::test]
    async fn delete_removes_blob_for_owned_record() {
        let (service, store) = test_service(false).await;
        let admin = seed_user(&service.db, Role::Admin).await;

        let record = service
            .upload(chair_fields(), Some(jpeg_file()), None)
            .await
            .unwrap();
        service.delete(record.id, &admin).await.unwrap();

        assert_eq!(store.delete_count(), 1);
        assert_eq!(store.deletes.lock().unwrap()[0], record.image_url);
    }

    #[tokio::test]
    async fn clear_all_requires_admin() {
        let (service, _store) = test_service(false).await;
        let user = seed_user(&service.db, Role::User).await;

        assert!(matches!(
            service.clear_all(&user).await,
            Err(CatalogError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn clear_all_isolates_blob_failures_per_record() {
        let (service, store) = test_service(false).await;
        let admin = seed_user(&service.db, Role::Admin).await;

        for _ in 0..3 {
            service
                .upload(chair_fields(), Some(jpeg_file()), None)
                .await
                .unwrap();
        }
        service.upload(chair_fields(), None, None).await.unwrap();

        store.fail_delete.store(true, Ordering::SeqCst);
        let report = service.clear_all(&admin).await.unwrap();

        assert_eq!(report.total, 4);
        assert_eq!(report.deleted_from_blob_store, 0);
        assert_eq!(report.deleted_from_metadata_store, 4);
        assert_eq!(report.errors.len(), 3);
        assert_eq!(record_count(&service.db).await, 0);
    }

    #[tokio::test]
    async fn clear_all_counts_blob_and_record_deletes() {
        let (service, store) = test_service(false).await;
        let admin = seed_user(&service.db, Role::Admin).await;

        for _ in 0..2 {
            service
                .upload(chair_fields(), Some(jpeg_file()), None)
                .await
                .unwrap();
        }
        service.upload(chair_fields(), None, None).await.unwrap();

        let report = service.clear_all(&admin).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.deleted_from_blob_store, 2);
        assert_eq!(report.deleted_from_metadata_store, 3);
        assert!(report.errors.is_empty());
        assert_eq!(store.delete_count(), 2);
    }
}

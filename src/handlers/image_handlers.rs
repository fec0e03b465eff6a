//! HTTP handlers for catalog records and stored blobs.
//!
//! Parses multipart uploads and delegates every lifecycle concern to
//! `ImageService`; blob downloads stream from disk without buffering the
//! payload in memory.

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::Field},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::{
    errors::AppError,
    handlers::auth_handlers::{AuthUser, MaybeUser},
    models::image::{ClearAllReport, ImageResponse},
    services::{
        image_service::{UploadFields, UploadedFile},
        object_store::StoreError,
    },
    state::AppState,
};

/// Multipart field carrying the picture payload.
const FILE_FIELD: &str = "image";

/// POST `/api/images` — multipart upload, picture optional.
pub async fn upload_image(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut fields = UploadFields::default();
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?
    {
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };
        match field_name.as_str() {
            "name" => fields.name = Some(read_text(field).await?),
            "description" => fields.description = Some(read_text(field).await?),
            "value" => fields.value = Some(read_text(field).await?),
            FILE_FIELD => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|err| {
                    AppError::bad_request(format!("failed to read file field: {err}"))
                })?;
                file = Some(UploadedFile {
                    bytes,
                    content_type,
                });
            }
            other => tracing::debug!("ignoring unknown multipart field `{}`", other),
        }
    }

    let record = state.images.upload(fields, file, actor.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|err| AppError::bad_request(format!("malformed multipart field: {err}")))
}

/// GET `/api/images` — all records, newest first.
pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageResponse>>, AppError> {
    let records = state.images.list().await?;
    Ok(Json(records))
}

/// GET `/api/images/{id}`
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ImageResponse>, AppError> {
    let record = state.images.get(id).await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// PATCH `/api/images/{id}/quantity`
pub async fn update_quantity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<ImageResponse>, AppError> {
    let record = state.images.update_quantity(id, req.quantity).await?;
    Ok(Json(record))
}

/// DELETE `/api/images/{id}` — owner or admin only.
pub async fn delete_image(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.images.delete(id, &actor).await?;
    Ok(Json(serde_json::json!({ "message": "image deleted" })))
}

/// DELETE `/api/images/clear-all` — admin bulk clear.
pub async fn clear_all_images(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<ClearAllReport>, AppError> {
    let report = state.images.clear_all(&actor).await?;
    Ok(Json(report))
}

/// GET `/files/{*key}` — stream a stored blob.
pub async fn get_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let (file, len) = state.files.reader(&key).await.map_err(|err| match err {
        StoreError::BlobNotFound(_) | StoreError::InvalidKey => {
            AppError::not_found("file not found")
        }
        other => AppError::internal(other.to_string()),
    })?;

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for_key(&key)),
    );
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    Ok(response)
}

fn content_type_for_key(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("jpeg") | Some("jpg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

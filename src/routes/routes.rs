//! Defines routes for the image catalog API.
//!
//! ## Structure
//! - **Auth endpoints**
//!   - `POST /api/auth/register` — create an account
//!   - `POST /api/auth/login` — exchange credentials for a bearer token
//!
//! - **Catalog endpoints**
//!   - `POST   /api/images` — multipart upload (picture optional)
//!   - `GET    /api/images` — list records, newest first
//!   - `GET    /api/images/{id}` — fetch one record
//!   - `PATCH  /api/images/{id}/quantity` — set the stock count
//!   - `DELETE /api/images/{id}` — delete record + blob (owner or admin)
//!   - `DELETE /api/images/clear-all` — admin bulk clear with report
//!
//! - **Blob endpoint**
//!   - `GET /files/{*key}` — stream a stored payload
//!
//! Health endpoints `/healthz` and `/readyz` are mounted at the root.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{
        auth_handlers::{login, register},
        health_handlers::{healthz, readyz},
        image_handlers::{
            clear_all_images, delete_image, get_file, get_image, list_images, update_quantity,
            upload_image,
        },
    },
    services::transcoder::MAX_UPLOAD_BYTES,
    state::AppState,
};

/// Build and return the router for the full HTTP surface.
///
/// The router carries shared state (`AppState`) to all handlers. The body
/// limit is raised above the transcoder's input cap so oversized payloads
/// reach the service layer and fail with a classified error there.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // auth endpoints
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        // catalog endpoints
        .route("/api/images", post(upload_image).get(list_images))
        .route("/api/images/clear-all", delete(clear_all_images))
        .route("/api/images/{id}", get(get_image).delete(delete_image))
        .route("/api/images/{id}/quantity", patch(update_quantity))
        // blob endpoint
        .route("/files/{*key}", get(get_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

//! Health & readiness handlers.
//!
//! - GET /healthz  -> liveness, no I/O
//! - GET /readyz   -> readiness: metadata store reachable, blob dir writable

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tokio::fs;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CheckStatus {
    fn pass() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn fail(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    database: CheckStatus,
    blob_store: CheckStatus,
}

/// `GET /healthz`
///
/// Always returns 200 OK; never performs I/O.
pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /readyz`
///
/// 200 when the metadata store answers `SELECT 1` and the blob directory
/// survives a write/read/delete round trip, 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let database = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.images.db)
        .await
    {
        Ok(1) => CheckStatus::pass(),
        Ok(other) => CheckStatus::fail(format!("unexpected result: {other}")),
        Err(err) => CheckStatus::fail(err.to_string()),
    };

    let blob_store = match probe_blob_dir(&state).await {
        Ok(()) => CheckStatus::pass(),
        Err(err) => CheckStatus::fail(err.to_string()),
    };

    let ready = database.ok && blob_store.ok;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadyResponse {
            status: if ready { "ok" } else { "error" },
            database,
            blob_store,
        }),
    )
}

/// Write, read back, and remove a probe file under the blob root.
async fn probe_blob_dir(state: &AppState) -> std::io::Result<()> {
    let probe = state
        .files
        .base_path()
        .join(format!(".readyz-{}", Uuid::new_v4()));
    fs::write(&probe, b"readyz").await?;
    let round_trip = fs::read(&probe).await;
    let _ = fs::remove_file(&probe).await;
    if round_trip? != b"readyz" {
        return Err(std::io::Error::other("probe content mismatch"));
    }
    Ok(())
}

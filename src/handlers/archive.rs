use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::shared::ensure_public_host;
use crate::error::{AppError, AppResult};
use crate::models::ArchiveResponse;
use crate::preview::parse_target;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ArchiveQuery {
    pub url: Option<String>,
}

/// GET /archive?url=<encoded-url>
///
/// Captures the page with the single-file tool and returns the snapshot as
/// base64. The snapshot is not kept once the response is built.
pub async fn archive_page(
    State(state): State<AppState>,
    Query(params): Query<ArchiveQuery>,
) -> AppResult<Json<ArchiveResponse>> {
    let url = params
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::ArchiveRequest("Missing ?url=".into()))?;

    let target = parse_target(&url).map_err(|e| AppError::ArchiveRequest(e.to_string()))?;
    if state.block_private_hosts {
        ensure_public_host(&target).await.map_err(|e| match e {
            AppError::Validation(msg) => AppError::ArchiveRequest(msg),
            other => other,
        })?;
    }

    let snapshot = state.archiver.capture(&target).await?;
    tracing::info!(url = %target, bytes = snapshot.archive.len(), "Archive captured");

    Ok(Json(ArchiveResponse {
        success: true,
        archive: snapshot.archive,
        timestamp: snapshot.timestamp,
    }))
}

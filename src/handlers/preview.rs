use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::shared::ensure_public_host;
use crate::error::{AppError, AppResult};
use crate::models::PreviewResult;
use crate::preview::{parse_target, DEFAULT_LANGUAGE};
use crate::state::AppState;

// ── Query params ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub url: Option<String>,
    pub lang: Option<String>,
}

// ── Handler ────────────────────────────────────────────────────────────────

/// GET /preview?url=<encoded-url>&lang=<language tag>
///
/// Returns `{title, description, image, domain}` for the page, any of which
/// may be null. 400 when `url` is missing or invalid, or when the page never
/// came back as HTML. A failure inside the extraction task is answered with
/// an all-null 200 so consumers never see a 5xx from this endpoint.
pub async fn get_preview(
    State(state): State<AppState>,
    Query(params): Query<PreviewQuery>,
) -> AppResult<Json<PreviewResult>> {
    let url = params
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing ?url=".into()))?;

    let target = parse_target(&url)?;
    if state.block_private_hosts {
        ensure_public_host(&target).await?;
    }

    let lang = params
        .lang
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let engine = state.engine.clone();
    let task = tokio::spawn(async move { engine.get_preview(&url, &lang).await });

    match task.await {
        Ok(Ok(result)) => Ok(Json(result)),
        Ok(Err(e)) => Err(e.into()),
        Err(e) => {
            tracing::error!(error = ?e, url = %target, "Preview task failed");
            Ok(Json(PreviewResult::default()))
        }
    }
}

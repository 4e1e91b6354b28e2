use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::preview::PreviewError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Every identity failed or got something other than HTML back.
    #[error("URL did not return HTML content")]
    NotHtml,

    /// Bad input on the archive endpoint; answered in its `{success, error}` shape.
    #[error("Archive request error: {0}")]
    ArchiveRequest(String),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

impl From<PreviewError> for AppError {
    fn from(e: PreviewError) -> Self {
        match e {
            PreviewError::InvalidUrl(msg) => AppError::Validation(format!("Invalid URL: {msg}")),
            PreviewError::NotHtml => AppError::NotHtml,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            // Carries an all-null metadata echo so preview consumers can
            // read the same shape on success and failure.
            AppError::NotHtml => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "URL did not return HTML content",
                    "title": null,
                    "description": null,
                    "image": null,
                    "domain": null,
                })),
            )
                .into_response(),
            AppError::ArchiveRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": msg })),
            )
                .into_response(),
            AppError::Archive(e) => {
                tracing::error!(error = ?e, "Archive capture failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": e.to_string(),
                        "details": e.details(),
                    })),
                )
                    .into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

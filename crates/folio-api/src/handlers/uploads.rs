//! Public retrieval of stored images.

use crate::constants::UPLOADS_CACHE_CONTROL;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use folio_core::AppError;
use folio_storage::{content_type_for, validate_filename};
use futures::StreamExt;
use std::sync::Arc;

/// Stream a stored image or thumbnail by its generated filename.
///
/// No authentication. Names that are not plain single-segment filenames are
/// rejected before the store is consulted.
#[utoipa::path(
    get,
    path = "/api/uploads/{filename}",
    tag = "uploads",
    params(
        ("filename" = String, Path, description = "Stored filename as returned by the upload endpoint")
    ),
    responses(
        (status = 200, description = "Image bytes; Content-Type follows the file extension"),
        (status = 400, description = "Invalid filename", body = ErrorResponse),
        (status = 404, description = "No such file", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_upload"))]
pub async fn get_upload(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, HttpAppError> {
    validate_filename(&filename)?;

    let content_length = state.storage.content_length(&filename).await?;
    let stream = state.storage.download_stream(&filename).await?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&filename))
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::CACHE_CONTROL, UPLOADS_CACHE_CONTROL)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })
}

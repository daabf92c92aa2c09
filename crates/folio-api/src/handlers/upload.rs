use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::auth::AuthenticatedUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::upload::UploadResponse;
use crate::state::AppState;
use crate::utils::multipart::extract_upload_candidate;
use crate::utils::request_context::RequestContext;

/// Upload image handler
///
/// Reads the single `file` field of the form and hands it to
/// [`UploadService`](crate::services::upload::UploadService), which validates,
/// converts, optimizes and stores it. Authentication and rate limiting have
/// already run as route layers by the time this is called.
///
/// # Errors
/// - `AppError::InvalidInput` - No `file` field, or a malformed form
/// - `AppError::RejectedUpload` - Disallowed type, SVG, empty, oversized or
///   mismatched signature
/// - `AppError::ConversionFailed` - HEIC/HEIF input could not be converted
/// - `AppError::UploadFailed` - Anything else; details are only logged
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "uploads",
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Form with a single image field named `file`"),
    responses(
        (status = 200, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Missing or rejected file", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 429, description = "Upload rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Upload or HEIC conversion failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, ctx, multipart),
    fields(username = %user.0.username, operation = "upload_image")
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let candidate = extract_upload_candidate(multipart).await?;
    let outcome = state.uploads.handle_upload(&ctx, candidate).await?;

    Ok(Json(UploadResponse::from(outcome)))
}

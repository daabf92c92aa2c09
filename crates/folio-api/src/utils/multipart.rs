//! Multipart upload extraction

use crate::constants::UPLOAD_FIELD;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use folio_core::{AppError, UploadCandidate};

/// A body cut off by the request size cap is a 413; anything else is a
/// malformed form.
fn read_error(what: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(format!("Failed to read {}: {}", what, err))
    }
}

/// Read the single `file` field of an upload form.
///
/// Returns `Ok(None)` when the form has no `file` field; other fields are
/// ignored. Declared MIME type and filename are kept verbatim (empty when the
/// client sent none) for the validator to judge.
pub async fn extract_upload_candidate(
    mut multipart: Multipart,
) -> Result<Option<UploadCandidate>, AppError> {
    let mut candidate: Option<UploadCandidate> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| read_error("multipart", e))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        if candidate.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let declared_filename = field.file_name().unwrap_or_default().to_string();
        let declared_mime = field.content_type().unwrap_or_default().to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| read_error("file data", e))?;

        candidate = Some(UploadCandidate::new(data, declared_mime, declared_filename));
    }

    Ok(candidate)
}

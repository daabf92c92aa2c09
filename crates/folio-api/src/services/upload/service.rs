//! Upload orchestrator
//!
//! Stages run strictly in order and each one gates the next:
//! validation, HEIC conversion, transcoding, persistence, thumbnail.
//! Rejections stop the pipeline before anything touches the store. A
//! non-HEIC processing failure degrades to storing the original bytes; a HEIC
//! one fails the upload. Thumbnail failures only drop the thumbnail.

use super::types::UploadOutcome;
use crate::middleware::audit;
use crate::utils::request_context::RequestContext;
use bytes::Bytes;
use folio_core::{AppError, ImageKind, ProcessedImage, StoredAsset, ThumbnailAsset, UploadCandidate};
use folio_processing::filename::{
    generate_secure_name, sanitize, secure_name_for_format, thumbnail_name,
};
use folio_processing::{raster, FileSignatureValidator, ImagePipeline};
use folio_storage::{Storage, StorageError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fresh names tried before a write collision is treated as a storage failure.
const MAX_NAME_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn Storage>,
    pipeline: ImagePipeline,
    validator: FileSignatureValidator,
    timeout: Duration,
}

impl UploadService {
    pub fn new(
        storage: Arc<dyn Storage>,
        pipeline: ImagePipeline,
        validator: FileSignatureValidator,
        timeout: Duration,
    ) -> Self {
        Self {
            storage,
            pipeline,
            validator,
            timeout,
        }
    }

    /// Run one upload through the pipeline.
    ///
    /// Errors other than client rejections and HEIC conversion failures are
    /// logged in full here and surface only as [`AppError::UploadFailed`].
    #[tracing::instrument(
        skip_all,
        fields(
            username = ?ctx.username(),
            client_ip = %ctx.client_ip,
            request_id = ?ctx.request_id,
            operation = "upload_image"
        )
    )]
    pub async fn handle_upload(
        &self,
        ctx: &RequestContext,
        candidate: Option<UploadCandidate>,
    ) -> Result<UploadOutcome, AppError> {
        let candidate =
            candidate.ok_or_else(|| AppError::InvalidInput("No file uploaded".to_string()))?;

        match self.process_upload(ctx, candidate).await {
            Ok(outcome) => Ok(outcome),
            Err(
                err @ (AppError::InvalidInput(_)
                | AppError::RejectedUpload(_)
                | AppError::ConversionFailed(_)),
            ) => Err(err),
            Err(err) => {
                tracing::error!(
                    error = %err,
                    error_type = err.error_type(),
                    "Upload failed unexpectedly"
                );
                Err(AppError::UploadFailed(err.to_string()))
            }
        }
    }

    async fn process_upload(
        &self,
        ctx: &RequestContext,
        candidate: UploadCandidate,
    ) -> Result<UploadOutcome, AppError> {
        let started = Instant::now();

        let kind = self.validate(ctx, &candidate)?;
        let validate_ms = started.elapsed().as_millis() as u64;

        let deadline = tokio::time::Instant::now() + self.timeout;
        let input_bytes = candidate.data.len();
        let UploadCandidate {
            data,
            declared_filename,
            ..
        } = candidate;

        let stage = Instant::now();
        let processed = self.process_image(data, kind, deadline).await?;
        let process_ms = stage.elapsed().as_millis() as u64;

        let stage = Instant::now();
        let original = self.store_original(&declared_filename, &processed).await?;
        let store_ms = stage.elapsed().as_millis() as u64;

        let stage = Instant::now();
        let thumbnail = self
            .store_thumbnail(&original, processed.data.clone(), deadline)
            .await;
        let thumbnail_ms = stage.elapsed().as_millis() as u64;

        tracing::info!(
            filename = %original.filename,
            source_format = %kind,
            format = %processed.format,
            input_bytes,
            size_bytes = original.size,
            width = ?processed.width,
            height = ?processed.height,
            transformed = processed.transformed,
            thumbnail = thumbnail.is_some(),
            validate_ms,
            process_ms,
            store_ms,
            thumbnail_ms,
            total_ms = started.elapsed().as_millis() as u64,
            "Upload completed"
        );
        audit::log_file_upload(
            ctx,
            &original.filename,
            original.size,
            processed.format.mime_type(),
        );

        Ok(UploadOutcome {
            original,
            thumbnail,
            format: processed.format,
            width: processed.width,
            height: processed.height,
        })
    }

    fn validate(
        &self,
        ctx: &RequestContext,
        candidate: &UploadCandidate,
    ) -> Result<ImageKind, AppError> {
        self.validator.validate(candidate).map_err(|err| {
            let declared_filename = sanitize(&candidate.declared_filename);
            let reason = err.to_string();
            tracing::warn!(
                username = ?ctx.username(),
                client_ip = %ctx.client_ip,
                declared_filename = %declared_filename,
                declared_mime = %candidate.declared_mime,
                size_bytes = candidate.data.len(),
                reason = %reason,
                "Upload rejected"
            );
            audit::log_upload_rejected(ctx, &declared_filename, &candidate.declared_mime, &reason);
            AppError::RejectedUpload(reason)
        })
    }

    /// HEIC conversion followed by transcoding.
    async fn process_image(
        &self,
        data: Bytes,
        kind: ImageKind,
        deadline: tokio::time::Instant,
    ) -> Result<ProcessedImage, AppError> {
        let heic_origin = kind.is_heic_family();

        let source = if heic_origin {
            self.pipeline
                .convert_heic(data, deadline)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, format = %kind, "HEIC/HEIF conversion failed");
                    AppError::ConversionFailed(e.to_string())
                })?
        } else {
            data
        };

        let processed = match self
            .pipeline
            .transcode(source.clone(), heic_origin, deadline)
            .await
        {
            Ok(processed) => processed,
            Err(e) if heic_origin => {
                tracing::error!(error = %e, "Optimizing converted HEIC/HEIF image failed");
                return Err(AppError::ConversionFailed(e.to_string()));
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    format = %kind,
                    "Image processing failed, storing original bytes"
                );
                // The header may still be readable when decoding was refused.
                let dimensions = raster::read_info(&source)
                    .ok()
                    .map(|info| (info.width, info.height));
                ProcessedImage::passthrough(source, kind, dimensions)
            }
        };

        if processed.format.is_heic_family() {
            return Err(AppError::ConversionFailed(
                "Processed image is still HEIC/HEIF".to_string(),
            ));
        }

        Ok(processed)
    }

    async fn store_original(
        &self,
        declared_filename: &str,
        processed: &ProcessedImage,
    ) -> Result<StoredAsset, AppError> {
        let content_type = processed.format.mime_type();

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let filename =
                secure_name_for_format(&generate_secure_name(declared_filename), processed.format);

            match self
                .storage
                .upload(&filename, content_type, processed.data.clone())
                .await
            {
                Ok(asset) => return Ok(asset),
                Err(StorageError::AlreadyExists(_)) => {
                    tracing::warn!(filename = %filename, attempt, "Secure name collision, retrying");
                }
                Err(e) => return Err(AppError::Storage(e.to_string())),
            }
        }

        Err(AppError::Storage(format!(
            "No unused file name after {} attempts",
            MAX_NAME_ATTEMPTS
        )))
    }

    /// Best effort: every failure is logged and yields `None`.
    async fn store_thumbnail(
        &self,
        original: &StoredAsset,
        data: Bytes,
        deadline: tokio::time::Instant,
    ) -> Option<ThumbnailAsset> {
        let thumbnail = match self.pipeline.thumbnail(data, deadline).await {
            Ok(thumbnail) => thumbnail,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    filename = %original.filename,
                    "Thumbnail generation failed"
                );
                return None;
            }
        };

        let filename = thumbnail_name(&original.filename);
        match self
            .storage
            .upload(&filename, ImageKind::Webp.mime_type(), thumbnail.data)
            .await
        {
            Ok(asset) => Some(ThumbnailAsset {
                filename: asset.filename,
                size: asset.size,
                url: asset.url,
                width: thumbnail.width,
                height: thumbnail.height,
            }),
            Err(e) => {
                tracing::warn!(error = %e, filename = %filename, "Storing thumbnail failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService")
            .field("pipeline", &self.pipeline)
            .field("validator", &self.validator)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

//! Bounded image worker pool
//!
//! All CPU- and memory-heavy work (HEIC decoding, transcoding, thumbnailing)
//! runs on the blocking thread pool behind a semaphore sized by
//! `TranscoderConfig::max_concurrent_jobs`. The limit is process-wide for a
//! given pipeline, no matter how many uploads arrive at once.

use crate::error::ProcessingError;
use crate::heic::{default_heic_decoder, HeicConverter, HeicDecoder};
use crate::thumbnail::{self, Thumbnail};
use crate::transcoder;
use bytes::Bytes;
use folio_core::{ProcessedImage, TranscoderConfig};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{timeout_at, Instant};

#[derive(Clone)]
pub struct ImagePipeline {
    config: Arc<TranscoderConfig>,
    permits: Arc<Semaphore>,
    heic: HeicConverter,
}

impl ImagePipeline {
    /// Pipeline using the HEIC decoder compiled into this build.
    pub fn new(config: TranscoderConfig) -> Self {
        Self::with_heic_decoder(config, default_heic_decoder())
    }

    pub fn with_heic_decoder(config: TranscoderConfig, decoder: Arc<dyn HeicDecoder>) -> Self {
        let jobs = config.max_concurrent_jobs.max(1);
        let heic = HeicConverter::new(
            decoder,
            config.heic_intermediate_quality,
            config.max_input_pixels,
        );

        tracing::info!(
            max_concurrent_jobs = jobs,
            max_dimension = config.max_dimension,
            max_input_pixels = config.max_input_pixels,
            max_decode_bytes = config.max_decode_bytes,
            "Image pipeline initialized"
        );

        Self {
            config: Arc::new(config),
            permits: Arc::new(Semaphore::new(jobs)),
            heic,
        }
    }

    pub fn config(&self) -> &TranscoderConfig {
        &self.config
    }

    /// Permits currently free; mainly useful for diagnostics and tests.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on the blocking pool once a permit is free.
    ///
    /// Both the wait for a permit and the job itself count against
    /// `deadline`. A job that outlives its deadline keeps its permit until it
    /// actually finishes, so the concurrency bound holds even after a timeout.
    async fn run_blocking<T, F>(&self, deadline: Instant, job: F) -> Result<T, ProcessingError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ProcessingError> + Send + 'static,
    {
        let permit = timeout_at(deadline, self.permits.clone().acquire_owned())
            .await
            .map_err(|_| ProcessingError::Timeout)?
            .map_err(|e| ProcessingError::WorkerUnavailable(e.to_string()))?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        match timeout_at(deadline, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ProcessingError::WorkerUnavailable(join_error.to_string())),
            Err(_) => Err(ProcessingError::Timeout),
        }
    }

    /// HEIC/HEIF to JPEG intermediate.
    pub async fn convert_heic(&self, data: Bytes, deadline: Instant) -> Result<Bytes, ProcessingError> {
        let heic = self.heic.clone();
        self.run_blocking(deadline, move || heic.convert_to_raster(&data))
            .await
    }

    pub async fn transcode(
        &self,
        data: Bytes,
        heic_origin: bool,
        deadline: Instant,
    ) -> Result<ProcessedImage, ProcessingError> {
        let config = self.config.clone();
        self.run_blocking(deadline, move || {
            transcoder::process(&data, heic_origin, &config)
        })
        .await
    }

    pub async fn thumbnail(&self, data: Bytes, deadline: Instant) -> Result<Thumbnail, ProcessingError> {
        let config = self.config.clone();
        let heic = self.heic.clone();
        self.run_blocking(deadline, move || {
            thumbnail::make_thumbnail(&data, &config, &heic)
        })
        .await
    }
}

impl std::fmt::Debug for ImagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePipeline")
            .field("config", &self.config)
            .field("available_permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn png(width: u32, height: u32) -> Bytes {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([5, 5, 5])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        Bytes::from(out.into_inner())
    }

    fn later() -> Instant {
        Instant::now() + Duration::from_secs(30)
    }

    #[tokio::test]
    async fn test_transcode_passthrough() {
        let pipeline = ImagePipeline::new(TranscoderConfig::default());
        let data = png(64, 32);
        let processed = pipeline.transcode(data.clone(), false, later()).await.unwrap();
        assert_eq!(processed.data, data);
        assert_eq!(pipeline.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_thumbnail_runs_on_pool() {
        let pipeline = ImagePipeline::new(TranscoderConfig::default());
        let thumb = pipeline.thumbnail(png(1600, 400), later()).await.unwrap();
        assert_eq!((thumb.width, thumb.height), (800, 200));
    }

    #[tokio::test]
    async fn test_jobs_are_serialized_with_one_permit() {
        let pipeline = ImagePipeline::new(TranscoderConfig::default());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let pipeline = pipeline.clone();
            let running = running.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                pipeline
                    .run_blocking(later(), move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_configurable_concurrency() {
        let config = TranscoderConfig {
            max_concurrent_jobs: 3,
            ..TranscoderConfig::default()
        };
        let pipeline = ImagePipeline::new(config);
        assert_eq!(pipeline.available_permits(), 3);
    }

    #[tokio::test]
    async fn test_deadline_exceeded_while_waiting_for_permit() {
        let pipeline = ImagePipeline::new(TranscoderConfig::default());
        let _held = pipeline.permits.clone().acquire_owned().await.unwrap();

        let deadline = Instant::now() + Duration::from_millis(20);
        let result = pipeline.transcode(png(8, 8), false, deadline).await;
        assert!(matches!(result, Err(ProcessingError::Timeout)));
    }

    #[tokio::test]
    async fn test_deadline_exceeded_while_running() {
        let pipeline = ImagePipeline::new(TranscoderConfig::default());
        let deadline = Instant::now() + Duration::from_millis(20);
        let result = pipeline
            .run_blocking(deadline, || {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ProcessingError::Timeout)));
    }

    #[tokio::test]
    async fn test_convert_heic_without_decoder_fails() {
        let pipeline = ImagePipeline::with_heic_decoder(
            TranscoderConfig::default(),
            Arc::new(crate::heic::UnsupportedHeicDecoder),
        );
        let mut data = vec![0x00, 0x00, 0x00, 0x18];
        data.extend_from_slice(b"ftypheic\x00\x00\x00\x00mif1heic");
        let result = pipeline.convert_heic(Bytes::from(data), later()).await;
        assert!(matches!(result, Err(ProcessingError::HeicUnsupported)));
    }
}

//! Application state shared by handlers and middleware.

use crate::auth::Authenticator;
use crate::services::upload::UploadService;
use folio_core::Config;
use folio_infra::UploadRateLimiter;
use folio_processing::{FileSignatureValidator, ImagePipeline};
use folio_storage::Storage;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub pipeline: ImagePipeline,
    pub rate_limiter: Arc<UploadRateLimiter>,
    pub authenticator: Arc<dyn Authenticator>,
    pub uploads: UploadService,
}

impl AppState {
    /// Wire the upload service from its collaborators.
    ///
    /// The pipeline is passed in (rather than built from `config.transcoder`)
    /// so tests can inject a custom HEIC decoder.
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        pipeline: ImagePipeline,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let rate_limiter = Arc::new(UploadRateLimiter::from_config(&config));
        let validator = FileSignatureValidator::new(config.max_file_size_bytes as u64);
        let uploads = UploadService::new(
            storage.clone(),
            pipeline.clone(),
            validator,
            config.upload_timeout(),
        );

        Self {
            config,
            storage,
            pipeline,
            rate_limiter,
            authenticator,
            uploads,
        }
    }
}

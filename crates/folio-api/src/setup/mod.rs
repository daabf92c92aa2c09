//! Application wiring: state construction, routes and server lifecycle.

pub mod routes;
pub mod server;

use crate::auth::StaticTokenAuthenticator;
use crate::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use folio_core::Config;
use folio_processing::ImagePipeline;
use folio_storage::LocalStorage;
use std::sync::Arc;

/// Build the production state: local disk storage, the compiled-in HEIC
/// decoder and the single configured admin token.
pub async fn build_state(config: Config) -> Result<Arc<AppState>> {
    let storage = LocalStorage::new(config.upload_dir.clone(), config.upload_public_path.clone())
        .await
        .with_context(|| {
            format!(
                "Failed to initialize upload directory {}",
                config.upload_dir.display()
            )
        })?;
    tracing::info!(
        upload_dir = %config.upload_dir.display(),
        public_path = %config.upload_public_path,
        "Local storage initialized"
    );

    let pipeline = ImagePipeline::new(config.transcoder.clone());
    let authenticator =
        StaticTokenAuthenticator::new(config.admin_api_token.clone(), config.admin_username.clone());

    Ok(Arc::new(AppState::new(
        config,
        Arc::new(storage),
        pipeline,
        Arc::new(authenticator),
    )))
}

/// Build state and router for `config`.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    let state = build_state(config).await?;
    let app = routes::setup_routes(&state.config, state.clone())?;
    Ok((state, app))
}

//! Route configuration and setup.

use crate::api_doc::ApiDoc;
use crate::auth::middleware::auth_middleware;
use crate::constants::{DOCS_PATH, HEALTH_PATH, OPENAPI_PATH, UPLOADS_PATH, UPLOAD_PATH};
use crate::handlers;
use crate::middleware::upload_rate_limit_middleware;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use folio_core::Config;
use folio_infra::{request_id_middleware, security_headers_middleware};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

/// Setup all application routes
///
/// The upload route is wrapped so that authentication runs first, then rate
/// limiting, and only then is the multipart body read.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let upload_routes = Router::new()
        .route(UPLOAD_PATH, post(handlers::upload::upload_image))
        .layer(from_fn_with_state(state.clone(), upload_rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let public_routes = Router::new()
        .route(UPLOADS_PATH, get(handlers::uploads::get_upload))
        .route(HEALTH_PATH, get(handlers::health::health_check))
        .route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }));

    tracing::info!(
        max_file_size_bytes = config.max_file_size_bytes,
        max_request_body_bytes = config.max_request_body_bytes,
        upload_rate_limit = config.upload_rate_limit,
        upload_rate_window_secs = config.upload_rate_window_secs,
        "Upload limits configured"
    );

    let app = public_routes
        .merge(upload_routes)
        // Oversized files must reach the validator (400). Bodies past the
        // request cap get 413, up front from Content-Length or mid-read for
        // chunked bodies.
        .layer(RequestBodyLimitLayer::new(config.max_request_body_bytes))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .layer(from_fn_with_state(
            config.is_production(),
            security_headers_middleware,
        ))
        .with_state(state)
        // RapiDoc loads its script from a CDN, so it stays outside the CSP layer.
        .merge(RapiDoc::new(OPENAPI_PATH).path(DOCS_PATH));

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let headers = [header::AUTHORIZATION, header::CONTENT_TYPE];

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
    };
    Ok(cors)
}

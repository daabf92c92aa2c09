//! Folio API Library
//!
//! HTTP surface of the portfolio image upload pipeline: handlers, middleware,
//! the upload orchestrator and application setup.

// Module declarations
mod api_doc;
pub mod constants;
mod handlers;
mod middleware;
mod services;
pub mod setup;
mod utils;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use api_doc::ApiDoc;
pub use error::{ErrorResponse, HttpAppError};
pub use services::upload::{UploadOutcome, UploadResponse, UploadService};
pub use state::AppState;
pub use utils::request_context::RequestContext;

//! Upload orchestration: validate, convert, optimize, persist, thumbnail.

pub mod service;
pub mod types;

pub use service::UploadService;
pub use types::{UploadOutcome, UploadResponse};

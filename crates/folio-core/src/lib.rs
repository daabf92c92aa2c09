//! Folio Core Library
//!
//! Configuration, error types and the transient domain values shared by the
//! processing, storage and API crates.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, TranscoderConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{ImageKind, ProcessedImage, StoredAsset, ThumbnailAsset, UploadCandidate};

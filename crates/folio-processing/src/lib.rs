//! Folio Processing Library
//!
//! Everything that touches untrusted upload bytes: signature validation,
//! filename hygiene, HEIC detection and conversion, transcoding and
//! thumbnailing. The pure decision functions live next to the effectful
//! encoders so they can be tested without a filesystem.

pub mod compression;
pub mod error;
pub mod filename;
pub mod heic;
pub mod pipeline;
pub mod raster;
pub mod thumbnail;
pub mod transcoder;
pub mod validator;

// Re-export commonly used types
pub use error::ProcessingError;
pub use heic::{default_heic_decoder, is_heic, HeicConverter, HeicDecoder};
pub use pipeline::ImagePipeline;
pub use thumbnail::Thumbnail;
pub use validator::{FileSignatureValidator, ValidationError, ValidationResult};

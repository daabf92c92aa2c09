//! Folio Storage Library
//!
//! Content store for uploaded images. The layout is a single flat directory
//! of secure filenames; thumbnails sit next to their originals with the
//! `-thumb.webp` suffix. There are no nested directories.

pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use keys::{content_type_for, validate_filename};
pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};

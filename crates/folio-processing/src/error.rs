use thiserror::Error;

/// Failures of the decode / convert / encode stages.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Unrecognized image format")]
    UnknownFormat,

    #[error("Image has {pixels} pixels, exceeding the limit of {max}")]
    TooManyPixels { pixels: u64, max: u64 },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Input is not a HEIC/HEIF container")]
    NotHeic,

    #[error("HEIC/HEIF decoding is not available in this build")]
    HeicUnsupported,

    #[error("Failed to decode HEIC/HEIF image: {0}")]
    HeicDecode(String),

    #[error("Image processing timed out")]
    Timeout,

    #[error("Image worker unavailable: {0}")]
    WorkerUnavailable(String),
}

impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Limits(limits) => ProcessingError::Decode(limits.to_string()),
            image::ImageError::Unsupported(_) => ProcessingError::UnknownFormat,
            other => ProcessingError::Decode(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ProcessingError {
    fn from(err: std::io::Error) -> Self {
        ProcessingError::Decode(err.to_string())
    }
}

//! Folio Infrastructure Library
//!
//! Shared infrastructure used by the HTTP server:
//! - Middleware (request ID, security headers)
//! - Telemetry initialization
//! - Upload rate limiting

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

// Re-export commonly used types
#[cfg(feature = "middleware")]
pub use middleware::{request_id_middleware, security_headers_middleware, RequestId};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{start_bucket_sweeper, UploadRateLimiter};

//! Route paths and HTTP constants shared by routes, handlers and the OpenAPI document.

pub const UPLOAD_PATH: &str = "/api/upload";
pub const UPLOADS_PATH: &str = "/api/uploads/{filename}";
pub const HEALTH_PATH: &str = "/health";
pub const OPENAPI_PATH: &str = "/api/openapi.json";
pub const DOCS_PATH: &str = "/docs";

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Stored names are never reused, so served files can be cached indefinitely.
pub const UPLOADS_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// How often expired rate limit buckets are swept.
pub const RATE_LIMIT_SWEEP_INTERVAL_SECS: u64 = 60;

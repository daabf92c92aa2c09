//! OpenAPI documentation, served as JSON and through RapiDoc.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::ErrorResponse;
use crate::handlers;
use crate::services::upload::UploadResponse;
use folio_core::ImageKind;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Folio Upload API",
        version = "0.1.0",
        description = "Authenticated image upload for the portfolio site. Uploads are validated by signature, HEIC/HEIF is converted, oversized images are optimized to WebP and every stored image gets a WebP thumbnail. Stored files are served publicly under /api/uploads/."
    ),
    paths(
        handlers::upload::upload_image,
        handlers::uploads::get_upload,
        handlers::health::health_check,
    ),
    components(
        schemas(
            UploadResponse,
            ErrorResponse,
            ImageKind,
            handlers::health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "uploads", description = "Image upload and retrieval"),
        (name = "health", description = "Liveness probe"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Admin API token"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_all_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| *p == "/api/upload"));
        assert!(paths.iter().any(|p| *p == "/api/uploads/{filename}"));
        assert!(paths.iter().any(|p| *p == "/health"));
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}

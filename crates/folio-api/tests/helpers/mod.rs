//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p folio-api`.

pub mod fixtures;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use folio_api::auth::StaticTokenAuthenticator;
use folio_api::setup::routes;
use folio_api::state::AppState;
use folio_core::Config;
use folio_processing::{HeicDecoder, ImagePipeline, ProcessingError};
use folio_storage::LocalStorage;
use image::{DynamicImage, Rgb, RgbImage};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Bearer token accepted by the test app.
pub const TEST_TOKEN: &str = "test-admin-token-at-least-32-characters-long";
pub const TEST_USERNAME: &str = "admin";

/// Stands in for libheif: every HEIC container decodes to a solid image.
pub struct SolidHeicDecoder {
    pub width: u32,
    pub height: u32,
}

impl HeicDecoder for SolidHeicDecoder {
    fn decode(&self, _data: &[u8], _max_pixels: u64) -> Result<DynamicImage, ProcessingError> {
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            self.width,
            self.height,
            Rgb([30, 90, 160]),
        )))
    }
}

/// Test application: server plus the temporary upload directory.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.state.config.upload_dir.clone()
    }

    /// Names currently in the upload directory, sorted.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(self.upload_dir()) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// POST `part` as the `file` field with the test token.
    pub async fn upload(&self, part: Part) -> TestResponse {
        self.server
            .post("/api/upload")
            .add_header("Authorization", format!("Bearer {}", TEST_TOKEN))
            .multipart(MultipartForm::new().add_part("file", part))
            .await
    }
}

/// Setup test app with default limits and local storage in a temp dir.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup test app, letting the caller adjust the config first.
pub async fn setup_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut config = Config {
        upload_dir: temp_dir.path().join("uploads"),
        admin_username: TEST_USERNAME.to_string(),
        admin_api_token: TEST_TOKEN.to_string(),
        // Unoptimized test builds decode large images slowly.
        upload_timeout_secs: 600,
        ..Config::default()
    };
    configure(&mut config);
    config.validate().expect("Invalid test config");

    let storage = LocalStorage::new(config.upload_dir.clone(), config.upload_public_path.clone())
        .await
        .expect("Failed to create local storage");
    let pipeline = ImagePipeline::with_heic_decoder(
        config.transcoder.clone(),
        Arc::new(SolidHeicDecoder {
            width: 1600,
            height: 1200,
        }),
    );
    let authenticator = StaticTokenAuthenticator::new(TEST_TOKEN, TEST_USERNAME);

    let state = Arc::new(AppState::new(
        config,
        Arc::new(storage),
        pipeline,
        Arc::new(authenticator),
    ));
    let app = routes::setup_routes(&state.config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

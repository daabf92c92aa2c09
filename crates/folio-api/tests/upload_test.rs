//! Upload endpoint integration tests.
//!
//! Run with: `cargo test -p folio-api --test upload_test`

mod helpers;

use axum::http::StatusCode;
use axum_test::multipart::MultipartForm;
use helpers::fixtures::{
    create_heic_stub, create_oversized_jpeg, create_svg, create_test_jpeg, create_test_png,
    file_part,
};
use helpers::{setup_test_app, setup_test_app_with, TEST_TOKEN};
use serde_json::Value;

#[tokio::test]
async fn test_large_jpeg_is_downscaled_to_webp() {
    let app = setup_test_app().await;

    let response = app
        .upload(file_part(create_test_jpeg(5000, 3000), "holiday.jpg", "image/jpeg"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["type"], "image/webp");
    assert_eq!(body["width"], 2500);
    assert_eq!(body["height"], 1500);

    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with(".webp"));
    assert_eq!(body["url"], format!("/api/uploads/{}", filename));

    let thumbnail_url = body["thumbnailUrl"].as_str().expect("thumbnail url");
    assert!(thumbnail_url.ends_with("-thumb.webp"));

    let thumbnail = app.client().get(thumbnail_url).await;
    assert_eq!(thumbnail.status_code(), StatusCode::OK);
    let decoded = image::load_from_memory(thumbnail.as_bytes()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (800, 480));
}

#[tokio::test]
async fn test_non_image_bytes_with_png_mime_are_rejected() {
    let app = setup_test_app().await;

    let response = app
        .upload(file_part(b"not an image".to_vec(), "innocent.png", "image/png"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("does not match declared type"));
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_oversized_file_is_rejected_with_400() {
    let app = setup_test_app().await;

    let response = app
        .upload(file_part(
            create_oversized_jpeg(11 * 1024 * 1024),
            "huge.jpg",
            "image/jpeg",
        ))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("too large"));
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_heic_is_stored_as_webp_and_served() {
    let app = setup_test_app().await;

    let response = app
        .upload(file_part(create_heic_stub(), "IMG_1234.HEIC", "image/heic"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["type"], "image/webp");
    assert_eq!(body["width"], 1600);
    assert_eq!(body["height"], 1200);

    let served = app.client().get(body["url"].as_str().unwrap()).await;
    assert_eq!(served.status_code(), StatusCode::OK);
    assert_eq!(served.headers()["content-type"], "image/webp");
    let bytes = served.as_bytes();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WEBP");

    assert!(app
        .stored_files()
        .iter()
        .all(|name| !name.ends_with(".heic") && !name.ends_with(".heif")));
}

#[tokio::test]
async fn test_eleventh_upload_in_window_is_rate_limited() {
    let app = setup_test_app().await;
    let png = create_test_png(64, 48);

    for i in 0..10 {
        let response = app
            .upload(file_part(png.clone(), "tiny.png", "image/png"))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK, "upload {}", i + 1);
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            (9 - i).to_string().as_str()
        );
    }

    let response = app
        .upload(file_part(png.clone(), "tiny.png", "image/png"))
        .await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let body: Value = response.json();
    assert_eq!(body["success"], false);

    // 10 originals, each with a thumbnail.
    assert_eq!(app.stored_files().len(), 20);
}

#[tokio::test]
async fn test_rejected_uploads_still_count_against_the_limit() {
    let app = setup_test_app_with(|config| config.upload_rate_limit = 2).await;

    for _ in 0..2 {
        let response = app
            .upload(file_part(create_svg(), "logo.svg", "image/svg+xml"))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .upload(file_part(create_test_png(8, 8), "ok.png", "image/png"))
        .await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_small_png_is_stored_unchanged() {
    let app = setup_test_app().await;
    let png = create_test_png(640, 480);

    let response = app
        .upload(file_part(png.clone(), "../../etc/passwd.png", "image/png"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["type"], "image/png");
    assert_eq!(body["size"], png.len());
    assert_eq!(body["width"], 640);
    assert_eq!(body["height"], 480);

    let filename = body["filename"].as_str().unwrap();
    assert!(!filename.contains('/') && !filename.contains(".."));
    let stored = std::fs::read(app.upload_dir().join(filename)).unwrap();
    assert_eq!(stored, png);
}

#[tokio::test]
async fn test_jpg_alias_mime_is_accepted() {
    let app = setup_test_app().await;

    let response = app
        .upload(file_part(create_test_jpeg(120, 80), "photo.jpg", "image/jpg"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["type"], "image/jpeg");
}

#[tokio::test]
async fn test_svg_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .upload(file_part(create_svg(), "logo.svg", "image/svg+xml"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "SVG files are not allowed");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_empty_file_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .upload(file_part(Vec::new(), "empty.png", "image/png"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "File is empty");
}

#[tokio::test]
async fn test_missing_file_field_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/upload")
        .add_header("Authorization", format!("Bearer {}", TEST_TOKEN))
        .multipart(MultipartForm::new().add_text("caption", "no file here"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn test_two_file_fields_are_rejected() {
    let app = setup_test_app().await;
    let png = create_test_png(8, 8);

    let response = app
        .client()
        .post("/api/upload")
        .add_header("Authorization", format!("Bearer {}", TEST_TOKEN))
        .multipart(
            MultipartForm::new()
                .add_part("file", file_part(png.clone(), "a.png", "image/png"))
                .add_part("file", file_part(png, "b.png", "image/png")),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_upload_requires_bearer_token() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/upload")
        .multipart(
            MultipartForm::new()
                .add_part("file", file_part(create_test_png(8, 8), "a.png", "image/png")),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);

    let response = app
        .client()
        .post("/api/upload")
        .add_header("Authorization", "Bearer wrong-token")
        .multipart(
            MultipartForm::new()
                .add_part("file", file_part(create_test_png(8, 8), "a.png", "image/png")),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_heic_without_decoder_support_fails_cleanly() {
    use folio_api::auth::StaticTokenAuthenticator;
    use folio_api::setup::routes;
    use folio_api::state::AppState;
    use folio_processing::heic::UnsupportedHeicDecoder;
    use folio_processing::ImagePipeline;
    use std::sync::Arc;

    let temp_dir = tempfile::tempdir().unwrap();
    let config = folio_core::Config {
        upload_dir: temp_dir.path().join("uploads"),
        admin_api_token: TEST_TOKEN.to_string(),
        ..folio_core::Config::default()
    };
    let storage = folio_storage::LocalStorage::new(config.upload_dir.clone(), "/api/uploads")
        .await
        .unwrap();
    let pipeline = ImagePipeline::with_heic_decoder(
        config.transcoder.clone(),
        Arc::new(UnsupportedHeicDecoder),
    );
    let state = Arc::new(AppState::new(
        config,
        Arc::new(storage),
        pipeline,
        Arc::new(StaticTokenAuthenticator::new(TEST_TOKEN, "admin")),
    ));
    let server =
        axum_test::TestServer::new(routes::setup_routes(&state.config, state.clone()).unwrap())
            .unwrap();

    let response = server
        .post("/api/upload")
        .add_header("Authorization", format!("Bearer {}", TEST_TOKEN))
        .multipart(MultipartForm::new().add_part(
            "file",
            file_part(create_heic_stub(), "IMG_1.heic", "image/heic"),
        ))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "Could not convert HEIC/HEIF image");
    assert_eq!(
        std::fs::read_dir(temp_dir.path().join("uploads"))
            .unwrap()
            .count(),
        0
    );
}

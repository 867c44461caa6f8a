//! Integration tests for the two generation endpoints.

mod common;

use common::{png, TestApp, GENERATION_MODEL};
use image_relay_service::models::Segment;
use image_relay_service::services::providers::mock::MockProvider;
use image_relay_service::services::providers::{OutputKind, ProviderError};
use reqwest::multipart::Form;

fn header<'a>(response: &'a reqwest::Response, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn generate_returns_png_with_metadata_headers() {
    let app = TestApp::spawn().await;

    let response = app
        .upload("/generate-image/", "cat.png", png(64, 64), Some("add a hat"))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(header(&response, "content-type"), "image/png");
    assert_eq!(header(&response, "x-original-filename"), "cat.png");
    assert_eq!(header(&response, "x-prompt"), "add a hat");
    assert_eq!(header(&response, "x-analysis"), "Mock response for: add a hat");

    let disposition = header(&response, "content-disposition").to_string();
    assert!(disposition.starts_with("attachment; filename=\"generated_"));
    assert!(disposition.ends_with(".png\""));

    let body = response.bytes().await.unwrap();
    let decoded = image::load_from_memory(&body).expect("Response is not an image");
    assert_eq!((decoded.width(), decoded.height()), (64, 64));

    let calls = app.provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model, GENERATION_MODEL);
    assert_eq!(calls[0].output, OutputKind::ImageAndText);
}

#[tokio::test]
async fn generate_keeps_only_the_artifact() {
    let app = TestApp::spawn().await;

    let response = app
        .upload("/generate-image/", "cat.png", png(8, 8), Some("add a hat"))
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let files = app.output_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("generated_"));
}

#[tokio::test]
async fn generate_without_trailing_slash_is_routed() {
    let app = TestApp::spawn().await;

    let response = app
        .upload("/generate-image", "cat.png", png(8, 8), Some("add a hat"))
        .await;

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn missing_prompt_uses_default() {
    let app = TestApp::spawn().await;

    let response = app.upload("/generate-image/", "cat.png", png(8, 8), None).await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(header(&response, "x-prompt"), "Transform this image creatively");
    assert_eq!(app.provider.calls()[0].prompt, "Transform this image creatively");
}

#[tokio::test]
async fn multiline_model_text_is_flattened_in_headers() {
    let app = TestApp::spawn_with(MockProvider::with_segments(vec![
        Segment::Text("first line\nsecond line".to_string()),
        Segment::Image(image_relay_service::models::InlineImage {
            mime_type: "image/png".to_string(),
            data: png(4, 4),
        }),
    ]))
    .await;

    let response = app
        .upload("/generate-image/", "cat.png", png(8, 8), Some("hat"))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(header(&response, "x-analysis"), "first line second line");
}

#[tokio::test]
async fn long_model_text_is_truncated_in_header() {
    let long_text = "a".repeat(800);
    let app = TestApp::spawn_with(MockProvider::with_segments(vec![
        Segment::Text(long_text),
        Segment::Image(image_relay_service::models::InlineImage {
            mime_type: "image/png".to_string(),
            data: png(4, 4),
        }),
    ]))
    .await;

    let response = app
        .upload("/generate-image/", "cat.png", png(8, 8), Some("hat"))
        .await;

    assert_eq!(header(&response, "x-analysis").len(), 500);
}

#[tokio::test]
async fn image_without_text_reports_no_text_response() {
    let app = TestApp::spawn_with(MockProvider::with_segments(vec![Segment::Image(
        image_relay_service::models::InlineImage {
            mime_type: "image/png".to_string(),
            data: png(4, 4),
        },
    )]))
    .await;

    let response = app
        .upload("/generate-image/", "cat.png", png(8, 8), Some("hat"))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(header(&response, "x-analysis"), "No text response");
}

#[tokio::test]
async fn text_only_answer_is_server_error() {
    let app = TestApp::spawn_with(MockProvider::with_segments(vec![Segment::Text(
        "I cannot draw that".to_string(),
    )]))
    .await;

    let response = app
        .upload("/generate-image/", "cat.png", png(8, 8), Some("hat"))
        .await;

    assert_eq!(response.status().as_u16(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "no_image_generated");
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("No image generated"));
    assert!(detail.contains("I cannot draw that"));
    assert!(app.output_files().is_empty());
}

#[tokio::test]
async fn details_report_stored_artifact() {
    let app = TestApp::spawn().await;

    let response = app
        .upload(
            "/generate-image-with-details/",
            "dog.png",
            png(16, 16),
            Some("make it blue"),
        )
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["prompt"], "make it blue");
    assert_eq!(body["analysis"], "Mock response for: make it blue");
    assert_eq!(body["original_image"], "dog.png");

    let filename = body["generated_image_filename"].as_str().unwrap();
    assert!(filename.starts_with("generated_"));
    assert!(app.output_dir().join(filename).is_file());

    let path = body["generated_image_path"].as_str().unwrap();
    assert!(path.ends_with(filename));
}

#[tokio::test]
async fn details_report_text_only_answer_as_unsuccessful() {
    let app = TestApp::spawn_with(MockProvider::with_segments(vec![Segment::Text(
        "Only words today".to_string(),
    )]))
    .await;

    let response = app
        .upload(
            "/generate-image-with-details",
            "dog.png",
            png(16, 16),
            Some("make it blue"),
        )
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["analysis"], "Only words today");
    assert_eq!(body["error"], "No image was generated, only text response");
    assert!(body.get("generated_image_path").is_none());
    assert!(app.output_files().is_empty());
}

#[tokio::test]
async fn undecodable_upload_is_rejected_before_the_model() {
    let app = TestApp::spawn().await;

    let response = app
        .upload("/generate-image/", "notes.png", b"not an image".to_vec(), Some("hat"))
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "invalid_image");
    assert!(app.provider.calls().is_empty());
    assert!(app.output_files().is_empty());
}

#[tokio::test]
async fn missing_image_part_is_bad_request() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/generate-image/"))
        .multipart(Form::new().text("prompt", "hat"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = TestApp::spawn().await;

    // Test config caps uploads at 1MiB
    let part = reqwest::multipart::Part::bytes(vec![0u8; 2 * 1024 * 1024]).file_name("big.png");
    let result = app
        .client
        .post(app.url("/generate-image/"))
        .multipart(Form::new().part("image", part))
        .send()
        .await;

    // The server may close the connection before the client finishes writing
    if let Ok(response) = result {
        assert_eq!(response.status().as_u16(), 413);
    }
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn upstream_failures_map_to_gateway_statuses() {
    let cases = [
        (ProviderError::RateLimited, 429, "upstream_rate_limited"),
        (
            ProviderError::NotConfigured("GOOGLE_API_KEY is not set".to_string()),
            503,
            "upstream_not_configured",
        ),
        (
            ProviderError::ApiError {
                status: 500,
                message: "backend exploded".to_string(),
            },
            502,
            "upstream_error",
        ),
    ];

    for (error, status, code) in cases {
        let app = TestApp::spawn_with(MockProvider::failing(error)).await;

        let response = app
            .upload("/generate-image/", "cat.png", png(8, 8), Some("hat"))
            .await;

        assert_eq!(response.status().as_u16(), status);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["code"], code);
        assert!(app.output_files().is_empty());
    }
}

#[tokio::test]
async fn upstream_api_errors_expose_upstream_status() {
    let app = TestApp::spawn_with(MockProvider::failing(ProviderError::ApiError {
        status: 403,
        message: "API key not valid".to_string(),
    }))
    .await;

    let response = app
        .upload("/generate-image-with-details/", "cat.png", png(8, 8), Some("hat"))
        .await;

    assert_eq!(response.status().as_u16(), 502);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["upstream_status"], 403);
    assert!(body["detail"].as_str().unwrap().contains("API key not valid"));
}

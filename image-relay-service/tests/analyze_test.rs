//! Integration tests for image analysis.

mod common;

use common::{png, TestApp, ANALYSIS_MODEL};
use image_relay_service::services::providers::OutputKind;

#[tokio::test]
async fn analysis_reports_text_and_dimensions() {
    let app = TestApp::spawn().await;

    let response = app
        .upload("/analyze-image/", "wide.png", png(100, 50), Some("describe"))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "wide.png");
    assert_eq!(body["prompt"], "describe");
    assert_eq!(body["analysis"], "Mock response for: describe");
    assert_eq!(body["image_dimensions"], "100x50");
}

#[tokio::test]
async fn analysis_uses_the_text_model() {
    let app = TestApp::spawn().await;

    app.upload("/analyze-image", "wide.png", png(10, 10), Some("describe"))
        .await;

    let calls = app.provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model, ANALYSIS_MODEL);
    assert_eq!(calls[0].output, OutputKind::Text);
    assert_eq!(calls[0].image_mime_type, "image/png");
}

#[tokio::test]
async fn analysis_default_prompt_and_no_leftovers() {
    let app = TestApp::spawn().await;

    let response = app
        .upload("/analyze-image/", "wide.png", png(10, 10), Some("   "))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["prompt"], "Analyze this image in detail");
    assert!(app.output_files().is_empty());
}

#[tokio::test]
async fn analysis_rejects_non_images() {
    let app = TestApp::spawn().await;

    let response = app
        .upload("/analyze-image/", "notes.txt", b"hello".to_vec(), None)
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "invalid_image");
}

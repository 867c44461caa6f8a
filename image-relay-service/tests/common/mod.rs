use image::{DynamicImage, ImageFormat, RgbImage};
use image_relay_service::config::{
    ModelConfig, ProviderBackend, ProviderConfig, RelayConfig, RetentionConfig, StorageConfig,
};
use image_relay_service::services::init_metrics;
use image_relay_service::services::providers::mock::MockProvider;
use image_relay_service::startup::Application;
use reqwest::multipart::{Form, Part};
use service_core::config::Config as CoreConfig;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const GENERATION_MODEL: &str = "test-generation-model";
pub const ANALYSIS_MODEL: &str = "test-analysis-model";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub provider: Arc<MockProvider>,
    pub client: reqwest::Client,
    // Held so the output directory lives as long as the app
    parent_dir: TempDir,
    output_dir: PathBuf,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(MockProvider::echo()).await
    }

    pub async fn spawn_with(provider: MockProvider) -> Self {
        // The recorder is process-global; another test may have installed it
        let _ = init_metrics();

        // Output lives one level down so tests can place files beside it
        let parent_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let output_dir = parent_dir.path().join("outputs");
        let config = test_config(&output_dir);
        let provider = Arc::new(provider);

        let app = Application::build_with_provider(config, provider.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            provider,
            client,
            parent_dir,
            output_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone()
    }

    /// Directory containing the output directory.
    pub fn parent_dir(&self) -> PathBuf {
        self.parent_dir.path().to_path_buf()
    }

    /// Names of all files currently in the output directory, sorted.
    pub fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.output_dir)
            .expect("Failed to list output dir")
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// POST a multipart upload with an `image` part and an optional `prompt`.
    pub async fn upload(
        &self,
        path: &str,
        filename: &str,
        image: Vec<u8>,
        prompt: Option<&str>,
    ) -> reqwest::Response {
        let part = Part::bytes(image)
            .file_name(filename.to_string())
            .mime_str("image/png")
            .unwrap();
        let mut form = Form::new().part("image", part);
        if let Some(prompt) = prompt {
            form = form.text("prompt", prompt.to_string());
        }

        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send upload")
    }
}

pub fn test_config(output_dir: &Path) -> RelayConfig {
    RelayConfig {
        common: CoreConfig { port: 0 },
        provider: ProviderConfig {
            backend: ProviderBackend::Mock,
            api_key: "test-api-key".to_string(),
            api_base: "http://127.0.0.1:1".to_string(),
            timeout_secs: 5,
        },
        models: ModelConfig {
            generation_model: GENERATION_MODEL.to_string(),
            analysis_model: ANALYSIS_MODEL.to_string(),
        },
        storage: StorageConfig {
            output_dir: output_dir.to_path_buf(),
            max_upload_bytes: 1024 * 1024,
        },
        retention: RetentionConfig {
            max_age_secs: 0,
            sweep_interval_secs: 3_600,
        },
    }
}

/// A solid-colour PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40])));
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .expect("Failed to encode PNG");
    buf.into_inner()
}

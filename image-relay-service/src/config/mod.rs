use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default upload limit (20MB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub provider: ProviderConfig,
    pub models: ModelConfig,
    pub storage: StorageConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub backend: ProviderBackend,
    pub api_key: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderBackend {
    Gemini,
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model used by both image generation endpoints (e.g., gemini-2.5-flash-image)
    pub generation_model: String,
    /// Text-only model used by the analysis endpoint
    pub analysis_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding temp inputs and generated artifacts
    pub output_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Artifacts older than this are swept; 0 keeps them forever
    pub max_age_secs: u64,
    pub sweep_interval_secs: u64,
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        // Handles .env and the APP__ prefix
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(RelayConfig {
            common: common_config,
            provider: ProviderConfig {
                backend: get_env("RELAY_PROVIDER", Some("gemini"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                api_key: get_env("GOOGLE_API_KEY", Some(""), is_prod)?,
                api_base: get_env("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE), is_prod)?,
                timeout_secs: parse_env("GEMINI_TIMEOUT_SECS", 120, is_prod)?,
            },
            models: ModelConfig {
                generation_model: get_env(
                    "GENERATION_MODEL",
                    Some("gemini-2.5-flash-image"),
                    is_prod,
                )?,
                analysis_model: get_env("ANALYSIS_MODEL", Some("gemini-1.5-pro"), is_prod)?,
            },
            storage: StorageConfig {
                output_dir: PathBuf::from(get_env("OUTPUT_DIR", Some("outputs"), is_prod)?),
                max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES, is_prod)?,
            },
            retention: RetentionConfig {
                max_age_secs: parse_env("RETENTION_MAX_AGE_SECS", 86_400, is_prod)?,
                sweep_interval_secs: parse_env("RETENTION_SWEEP_INTERVAL_SECS", 3_600, is_prod)?,
            },
        })
    }

    /// Model names reported by `/health`.
    pub fn models_available(&self) -> Vec<String> {
        vec![
            self.models.generation_model.clone(),
            self.models.analysis_model.clone(),
        ]
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RetentionConfig {
    pub fn enabled(&self) -> bool {
        self.max_age_secs > 0
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl std::str::FromStr for ProviderBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(ProviderBackend::Gemini),
            "mock" => Ok(ProviderBackend::Mock),
            _ => Err(format!("Invalid provider backend: {}", s)),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr + ToString,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(&default.to_string()), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{} is invalid: {}", key, e)))
}

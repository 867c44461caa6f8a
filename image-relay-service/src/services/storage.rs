use crate::error::RelayError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Prefix of every generated artifact.
pub const GENERATED_PREFIX: &str = "generated_";

/// A generated image persisted in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub filename: String,
    pub path: PathBuf,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Directory that holds temp inputs and generated artifacts.
    fn root(&self) -> &Path;

    /// Persist PNG bytes under a fresh `generated_<uuid>.png` name.
    async fn save_png(&self, data: Vec<u8>) -> Result<StoredArtifact, RelayError>;

    /// Read an artifact by bare file name.
    async fn read(&self, filename: &str) -> Result<Vec<u8>, RelayError>;
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, RelayError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    /// Map a client-supplied name onto a file inside the output directory.
    ///
    /// Only a single plain path component is accepted, and the canonical
    /// result must still live under the canonical root, so neither `..` nor
    /// symlinks can escape it. Anything else is reported as not found.
    pub async fn resolve(&self, filename: &str) -> Result<PathBuf, RelayError> {
        if !is_plain_file_name(filename) {
            tracing::warn!(filename = %filename, "Rejected download name");
            return Err(RelayError::NotFound);
        }

        let root = fs::canonicalize(&self.base_path).await?;
        let candidate = match fs::canonicalize(root.join(filename)).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(RelayError::NotFound),
            Err(e) => return Err(e.into()),
        };

        if !candidate.starts_with(&root) {
            tracing::warn!(filename = %filename, "Download name resolved outside output directory");
            return Err(RelayError::NotFound);
        }

        match fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => Ok(candidate),
            Ok(_) => Err(RelayError::NotFound),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RelayError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains('\0') || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[async_trait]
impl Storage for LocalStorage {
    fn root(&self) -> &Path {
        &self.base_path
    }

    async fn save_png(&self, data: Vec<u8>) -> Result<StoredArtifact, RelayError> {
        let filename = format!("{}{}.png", GENERATED_PREFIX, Uuid::new_v4());
        let path = self.base_path.join(&filename);
        fs::write(&path, data).await?;

        metrics::counter!("relay_artifacts_written_total").increment(1);

        Ok(StoredArtifact { filename, path })
    }

    async fn read(&self, filename: &str) -> Result<Vec<u8>, RelayError> {
        let path = self.resolve(filename).await?;
        let data = fs::read(path).await?;
        Ok(data)
    }
}

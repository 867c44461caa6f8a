//! Background retention for the output directory.
//!
//! Generated artifacts are never referenced again by the service once the
//! response is sent, so anything older than the configured age is removed.
//! Temp inputs left behind by a crash are swept under the same rule.

use super::imaging::{TEMP_ANALYZE_PREFIX, TEMP_INPUT_PREFIX};
use super::storage::GENERATED_PREFIX;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio_util::sync::CancellationToken;

pub struct RetentionSweeper {
    root: PathBuf,
    max_age: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(root: impl Into<PathBuf>, max_age: Duration, interval: Duration) -> Self {
        Self {
            root: root.into(),
            max_age,
            interval,
        }
    }

    /// Sweep periodically until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            root = ?self.root,
            max_age_secs = self.max_age.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Starting retention sweeper"
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Retention sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(0) => {}
                        Ok(removed) => tracing::info!(removed, "Swept expired artifacts"),
                        Err(e) => tracing::error!(error = %e, "Retention sweep failed"),
                    }
                }
            }
        }
    }

    /// Delete managed files older than `max_age`. Returns how many were removed.
    pub async fn sweep_once(&self) -> std::io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0usize;
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_managed(name) {
                continue;
            }

            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            let age = meta
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < self.max_age {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                // Raced with a request finishing its own cleanup
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(file = %name, error = %e, "Failed to remove expired file"),
            }
        }

        metrics::counter!("relay_artifacts_swept_total").increment(removed as u64);
        Ok(removed)
    }
}

fn is_managed(name: &str) -> bool {
    name.starts_with(GENERATED_PREFIX)
        || name.starts_with(TEMP_INPUT_PREFIX)
        || name.starts_with(TEMP_ANALYZE_PREFIX)
}

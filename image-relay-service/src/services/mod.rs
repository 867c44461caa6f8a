pub mod imaging;
pub mod metrics;
pub mod pipeline;
pub mod providers;
pub mod retention;
pub mod storage;

pub use self::metrics::{get_metrics, init_metrics};
pub use retention::RetentionSweeper;
pub use storage::{LocalStorage, Storage, StoredArtifact};

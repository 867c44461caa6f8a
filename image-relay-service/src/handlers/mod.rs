//! HTTP handlers for the image relay service.

pub mod analyze;
pub mod download;
pub mod generate;
pub mod health;
pub mod upload;

pub use analyze::analyze_image;
pub use download::download_image;
pub use generate::{generate_image, generate_image_with_details};
pub use health::{health_check, metrics, root};

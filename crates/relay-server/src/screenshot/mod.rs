//! Screenshot filing.
//!
//! The relay hands raw image data plus the current page URL to a
//! [`ScreenshotStore`], which decides where the file lives.

mod naming;
mod store;

use std::path::PathBuf;

use async_trait::async_trait;
use relay_protocols::CaptureScreenshotResponse;

use crate::error::FilingError;

pub use naming::{sanitize_directory_name, sanitize_filename, screenshot_filename, url_category};
pub use store::FileScreenshotStore;

/// Per-request filing hints.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    pub filename: Option<String>,
    pub project_name: Option<String>,
    /// Absolute directory that replaces the configured storage root.
    pub base_directory: Option<String>,
    pub return_image_data: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedScreenshot {
    pub file_path: PathBuf,
    pub filename: String,
    pub project_directory: String,
    pub url_category: String,
    /// Base64 payload without the data-URL prefix.
    pub image_data: Option<String>,
}

impl From<SavedScreenshot> for CaptureScreenshotResponse {
    fn from(saved: SavedScreenshot) -> Self {
        Self {
            file_path: saved.file_path.display().to_string(),
            filename: saved.filename,
            project_directory: saved.project_directory,
            url_category: saved.url_category,
            image_data: saved.image_data,
        }
    }
}

/// Persists screenshots received from the extension.
#[async_trait]
pub trait ScreenshotStore: Send + Sync {
    async fn save(
        &self,
        image: &str,
        url: Option<&str>,
        options: SaveOptions,
    ) -> Result<SavedScreenshot, FilingError>;
}

//! Filesystem screenshot store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use relay_config::{ConfigLoader, ScreenshotConfig};
use tokio::process::Command;
use tracing::{debug, info};

use super::naming::{
    clean_base64, project_from_dir, repo_name_from_remote, sanitize_directory_name,
    screenshot_filename, url_category,
};
use super::{SaveOptions, SavedScreenshot, ScreenshotStore};
use crate::error::FilingError;

const DEFAULT_BASE_FOLDER: &str = "Windsurf_Screenshots";
const DEFAULT_PROJECT: &str = "default-project";
const GIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Files screenshots under `<base>/<project>/<category>/<filename>`.
pub struct FileScreenshotStore {
    storage_root: PathBuf,
    project_name: Option<String>,
    working_dir: PathBuf,
}

impl FileScreenshotStore {
    pub fn new(config: &ScreenshotConfig) -> Self {
        Self {
            storage_root: ConfigLoader::expand_path(&config.storage_path),
            project_name: config.project_name.clone(),
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Directory used for git and cwd based project detection.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    fn resolve_base(&self, requested: Option<&str>) -> PathBuf {
        if let Some(path) = requested.map(Path::new).filter(|p| p.is_absolute()) {
            return path.to_path_buf();
        }
        if self.storage_root.is_absolute() {
            return self.storage_root.clone();
        }
        if !self.storage_root.as_os_str().is_empty() {
            return self.working_dir.join(&self.storage_root);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Downloads")
            .join(DEFAULT_BASE_FOLDER)
    }

    async fn resolve_project(&self, requested: Option<&str>) -> String {
        let explicit = requested
            .or(self.project_name.as_deref())
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string);
        let detected = match explicit {
            Some(name) => Some(name),
            None => match self.git_project().await {
                Some(name) => Some(name),
                None => self.cwd_project(),
            },
        };
        detected
            .map(|name| sanitize_directory_name(&name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string())
    }

    async fn git_project(&self) -> Option<String> {
        let output = Command::new("git")
            .args(["config", "--get", "remote.origin.url"])
            .current_dir(&self.working_dir)
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(GIT_TIMEOUT, output).await.ok()?.ok()?;
        if !output.status.success() {
            return None;
        }
        repo_name_from_remote(&String::from_utf8_lossy(&output.stdout))
    }

    fn cwd_project(&self) -> Option<String> {
        let name = self.working_dir.file_name()?.to_string_lossy().to_string();
        let parent = self
            .working_dir
            .parent()
            .and_then(Path::file_name)
            .map(|p| p.to_string_lossy().to_string());
        project_from_dir(&name, parent.as_deref())
    }
}

#[async_trait]
impl ScreenshotStore for FileScreenshotStore {
    async fn save(
        &self,
        image: &str,
        url: Option<&str>,
        options: SaveOptions,
    ) -> Result<SavedScreenshot, FilingError> {
        let payload = clean_base64(image);
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| FilingError::InvalidImage(e.to_string()))?;

        let base = self.resolve_base(options.base_directory.as_deref());
        let project_directory = self.resolve_project(options.project_name.as_deref()).await;
        let url_category = url_category(url);
        let filename =
            screenshot_filename(url, options.filename.as_deref(), chrono::Utc::now());

        let dir = base.join(&project_directory).join(&url_category);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| FilingError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        let file_path = dir.join(&filename);
        tokio::fs::write(&file_path, &bytes)
            .await
            .map_err(|source| FilingError::Write {
                path: file_path.clone(),
                source,
            })?;
        debug!("Wrote {} bytes to {:?}", bytes.len(), file_path);
        info!("Screenshot saved to {:?}", file_path);

        Ok(SavedScreenshot {
            file_path,
            filename,
            project_directory,
            url_category,
            image_data: options.return_image_data.then(|| payload.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    fn store_in(root: &Path, project: Option<&str>) -> FileScreenshotStore {
        FileScreenshotStore::new(&ScreenshotConfig {
            storage_path: root.display().to_string(),
            project_name: project.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_save_files_under_project_and_category() {
        let root = TempDir::new().unwrap();
        let store = store_in(root.path(), Some("Acme Shop"));

        let saved = store
            .save(
                &format!("data:image/png;base64,{PNG_1X1}"),
                Some("http://localhost:3000/cart/items"),
                SaveOptions {
                    filename: Some("cart view".to_string()),
                    return_image_data: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(saved.project_directory, "acme-shop");
        assert_eq!(saved.url_category, "cart");
        assert!(saved.filename.ends_with("_cart_view.png"));
        assert_eq!(saved.image_data.as_deref(), Some(PNG_1X1));
        assert!(saved.file_path.starts_with(root.path().join("acme-shop").join("cart")));

        let written = std::fs::read(&saved.file_path).unwrap();
        assert_eq!(written, STANDARD.decode(PNG_1X1).unwrap());
    }

    #[tokio::test]
    async fn test_request_project_and_base_override_config() {
        let root = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let store = store_in(root.path(), Some("configured"));

        let saved = store
            .save(
                PNG_1X1,
                None,
                SaveOptions {
                    project_name: Some("Requested".to_string()),
                    base_directory: Some(other.path().display().to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(saved.project_directory, "requested");
        assert_eq!(saved.url_category, "general");
        assert!(saved.image_data.is_none());
        assert!(saved.file_path.starts_with(other.path()));
    }

    #[tokio::test]
    async fn test_cwd_project_skips_generic_names() {
        let root = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let cwd = work.path().join("storefront").join("frontend");
        std::fs::create_dir_all(&cwd).unwrap();

        let store = store_in(root.path(), None).with_working_dir(&cwd);
        // A temp dir is not a git checkout, so detection falls through to the cwd.
        assert_eq!(store.resolve_project(None).await, "storefront");
    }

    #[tokio::test]
    async fn test_invalid_base64_is_rejected() {
        let root = TempDir::new().unwrap();
        let store = store_in(root.path(), Some("p"));
        let err = store
            .save("!!not-base64!!", None, SaveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FilingError::InvalidImage(_)));
    }

    #[test]
    fn test_relative_storage_path_resolves_against_working_dir() {
        let cwd = TempDir::new().unwrap();
        let store = FileScreenshotStore::new(&ScreenshotConfig {
            storage_path: "shots/captures".to_string(),
            project_name: None,
        })
        .with_working_dir(cwd.path());
        assert_eq!(store.resolve_base(None), cwd.path().join("shots/captures"));

        let unset = FileScreenshotStore::new(&ScreenshotConfig {
            storage_path: String::new(),
            project_name: None,
        });
        assert!(unset.resolve_base(None).ends_with(DEFAULT_BASE_FOLDER));
    }

    #[test]
    fn test_relative_request_base_is_ignored() {
        let root = TempDir::new().unwrap();
        let store = store_in(root.path(), None);
        assert_eq!(store.resolve_base(Some("relative/dir")), root.path());
    }
}

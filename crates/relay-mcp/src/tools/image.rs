//! `analyzeImageFile`: load a saved screenshot or any project image.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use walkdir::WalkDir;

use super::{Tool, parse_params};
use crate::error::ToolError;
use crate::protocol::{Content, ToolDefinition, ToolResult};

/// Directories never descended into by the filename search.
const SKIPPED_DIRS: [&str; 2] = ["node_modules", "dist"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeImageParams {
    image_path: String,
    #[serde(default)]
    project_root: Option<String>,
}

pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        _ => "image/png",
    }
}

/// Depth-first search for a file called `name` under `root`.
fn find_file(root: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let dir = entry.file_name().to_string_lossy();
            !dir.starts_with('.') && !SKIPPED_DIRS.contains(&dir.as_ref())
        })
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name().to_string_lossy() == name)
        .map(|entry| entry.into_path())
}

/// Absolute paths are taken as-is. Relative ones are tried against the
/// working directory, then the project root, then searched for by name.
fn locate(image_path: &str, root: &Path, cwd: &Path) -> Option<PathBuf> {
    let requested = Path::new(image_path);
    if requested.is_absolute() {
        return requested.is_file().then(|| requested.to_path_buf());
    }
    if let Some(direct) = [cwd.join(requested), root.join(requested)]
        .into_iter()
        .find(|p| p.is_file())
    {
        return Some(direct);
    }
    let name = requested.file_name()?.to_string_lossy().to_string();
    find_file(root, &name)
}

pub struct AnalyzeImageFileTool {
    definition: ToolDefinition,
    project_root: Option<String>,
}

impl AnalyzeImageFileTool {
    pub fn new(project_root: Option<String>) -> Self {
        let definition = ToolDefinition::new(
            "analyzeImageFile",
            "Load and analyze previously saved images or existing image files. Use this to \
             access historical screenshots taken with takeScreenshot or any other image files \
             in your project.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "imagePath": {
                    "type": "string",
                    "description": "Path to the image file, project-relative or absolute"
                },
                "projectRoot": {
                    "type": "string",
                    "description": "Override for the project root; defaults to PROJECT_ROOT or the working directory"
                }
            },
            "required": ["imagePath"]
        }));
        Self {
            definition,
            project_root,
        }
    }

    async fn load(&self, params: AnalyzeImageParams) -> Result<ToolResult, std::io::Error> {
        let cwd = std::env::current_dir()?;
        let root = params
            .project_root
            .or_else(|| self.project_root.clone())
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.clone());

        let image_path = params.image_path.clone();
        let found = tokio::task::spawn_blocking(move || locate(&image_path, &root, &cwd))
            .await
            .map_err(std::io::Error::other)?;

        let Some(path) = found else {
            return Ok(ToolResult::error(format!("File not found: {}", params.image_path)));
        };
        debug!("Loading image {:?}", path);
        let bytes = tokio::fs::read(&path).await?;
        Ok(ToolResult {
            content: vec![Content::image(STANDARD.encode(bytes), mime_type_for(&path))],
            is_error: false,
        })
    }
}

#[async_trait]
impl Tool for AnalyzeImageFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: Value) -> Result<ToolResult, ToolError> {
        let params: AnalyzeImageParams = parse_params(params)?;
        Ok(self
            .load(params)
            .await
            .unwrap_or_else(|e| ToolResult::error(format!("Error processing image: {}", e))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    fn write(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, PNG_BYTES).unwrap();
        path
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.svg")), "image/svg+xml");
        assert_eq!(mime_type_for(Path::new("a.ico")), "image/x-icon");
        assert_eq!(mime_type_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("noext")), "image/png");
    }

    #[test]
    fn test_locate_prefers_direct_paths() {
        let root = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        let in_root = write(root.path(), "shots/home.png");
        let in_cwd = write(cwd.path(), "shots/home.png");

        assert_eq!(locate("shots/home.png", root.path(), cwd.path()), Some(in_cwd));
        std::fs::remove_file(cwd.path().join("shots/home.png")).unwrap();
        assert_eq!(locate("shots/home.png", root.path(), cwd.path()), Some(in_root));
    }

    #[test]
    fn test_search_skips_vendor_and_hidden_dirs() {
        let root = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        write(root.path(), "node_modules/pkg/logo.png");
        write(root.path(), ".cache/logo.png");
        write(root.path(), "dist/logo.png");
        assert_eq!(locate("logo.png", root.path(), cwd.path()), None);

        let real = write(root.path(), "src/assets/logo.png");
        assert_eq!(locate("images/logo.png", root.path(), cwd.path()), Some(real));
    }

    #[tokio::test]
    async fn test_execute_returns_image_block() {
        let root = TempDir::new().unwrap();
        let path = write(root.path(), "capture.jpeg");
        let tool = AnalyzeImageFileTool::new(None);

        let result = tool
            .execute(json!({"imagePath": path.display().to_string()}))
            .await
            .unwrap();

        assert_eq!(
            result.content,
            vec![Content::image(STANDARD.encode(PNG_BYTES), "image/jpeg")]
        );
    }

    #[tokio::test]
    async fn test_execute_reports_missing_file() {
        let root = TempDir::new().unwrap();
        let tool = AnalyzeImageFileTool::new(Some(root.path().display().to_string()));

        let result = tool
            .execute(json!({"imagePath": "nowhere/missing-capture-7f3a.png"}))
            .await
            .unwrap();

        assert!(result.is_error);
        assert_eq!(
            result.joined_text(),
            "File not found: nowhere/missing-capture-7f3a.png"
        );
    }
}

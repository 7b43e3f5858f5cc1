use std::path::{Path, PathBuf};

use crate::config::{
    DEFAULT_DOT_PATH, DEFAULT_IMAGE_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_SOURCE_DIR, RenderSettings,
};
use crate::util::paths::{normalize, relative_path};

/// Build layout and tool settings the render pipeline works against.
#[derive(Debug, Clone)]
pub struct RenderPipelineConfig {
    /// Layout executable used when a request does not override it.
    pub dot_path: String,
    /// Extra arguments passed before the format and output flags.
    pub dot_args: Vec<String>,
    pub output_dir: PathBuf,
    /// Image directory, relative to `output_dir`.
    pub image_dir: PathBuf,
    pub source_dir: PathBuf,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            dot_path: DEFAULT_DOT_PATH.to_string(),
            dot_args: Vec::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
        }
    }
}

impl From<&RenderSettings> for RenderPipelineConfig {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            dot_path: settings.dot_path.clone(),
            dot_args: settings.dot_args.clone(),
            output_dir: settings.output_dir.clone(),
            image_dir: settings.image_dir.clone(),
            source_dir: settings.source_dir.clone(),
        }
    }
}

impl RenderPipelineConfig {
    /// Directory rendered images are written into.
    pub fn image_root(&self) -> PathBuf {
        normalize(&self.output_dir.join(&self.image_dir))
    }

    /// Output directory of the document named `docname`.
    pub fn document_dir(&self, docname: &str) -> PathBuf {
        parent_or_self(&normalize(&self.output_dir.join(docname)))
    }

    /// Image directory as seen from the document named `docname`.
    pub fn image_path_for(&self, docname: &str) -> PathBuf {
        relative_path(&self.image_root(), &self.document_dir(docname))
    }

    /// Working directory for the layout tool, so relative paths inside the
    /// graph resolve against the source being rendered.
    pub fn working_dir(&self, filename: Option<&Path>, docname: &str) -> PathBuf {
        let anchor = match filename {
            Some(filename) => self.source_dir.join(filename),
            None => self.source_dir.join(docname),
        };
        parent_or_self(&anchor)
    }
}

fn parent_or_self(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RenderPipelineConfig {
        RenderPipelineConfig {
            output_dir: PathBuf::from("/build/html"),
            source_dir: PathBuf::from("/docs"),
            ..RenderPipelineConfig::default()
        }
    }

    #[test]
    fn image_path_is_relative_to_the_document() {
        let config = config();
        assert_eq!(config.image_path_for("index"), PathBuf::from("_images"));
        assert_eq!(
            config.image_path_for("api/reference"),
            PathBuf::from("../_images")
        );
    }

    #[test]
    fn working_dir_prefers_graph_file() {
        let config = config();
        assert_eq!(
            config.working_dir(None, "guide/intro"),
            PathBuf::from("/docs/guide")
        );
        assert_eq!(
            config.working_dir(Some(Path::new("graphs/flow.dot")), "guide/intro"),
            PathBuf::from("/docs/graphs")
        );
    }

    #[test]
    fn image_root_joins_output_and_image_dirs() {
        assert_eq!(config().image_root(), PathBuf::from("/build/html/_images"));
    }
}

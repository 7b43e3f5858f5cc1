use std::{
    collections::BTreeMap,
    fmt, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::paths::to_posix;

/// Filename prefix used when callers do not supply one.
pub const DEFAULT_PREFIX: &str = "graphviz";
/// Option key naming the referencing document (without suffix).
pub const DOCNAME_OPTION: &str = "docname";
/// Option key overriding the layout executable for a single request.
pub const TOOL_OPTION: &str = "graphviz_dot";

const DEFAULT_DOCNAME: &str = "index";

/// Output formats the layout tool is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Svg,
    Pdf,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
            ImageFormat::Pdf => "pdf",
        }
    }

    /// Raster output gets a companion client-side image map.
    pub fn has_image_map(self) -> bool {
        matches!(self, ImageFormat::Png)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported image format `{0}` (expected png, svg or pdf)")]
pub struct UnknownImageFormat(pub String);

impl FromStr for ImageFormat {
    type Err = UnknownImageFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            "pdf" => Ok(ImageFormat::Pdf),
            _ => Err(UnknownImageFormat(value.to_string())),
        }
    }
}

/// String-keyed render settings attached to a graph.
///
/// Kept ordered so its string form, which feeds the cache key, is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions(BTreeMap<String, String>);

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn with_docname(mut self, docname: impl Into<String>) -> Self {
        self.insert(DOCNAME_OPTION, docname);
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.insert(TOOL_OPTION, tool);
        self
    }

    pub fn docname(&self) -> &str {
        self.get(DOCNAME_OPTION).unwrap_or(DEFAULT_DOCNAME)
    }

    pub fn tool(&self) -> Option<&str> {
        self.get(TOOL_OPTION)
    }

    pub(crate) fn cache_repr(&self) -> String {
        format!("{:?}", self.0)
    }
}

/// A graph waiting to be turned into an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Graph description handed to the layout tool on stdin.
    pub source: String,
    pub options: RenderOptions,
    pub format: ImageFormat,
    pub prefix: String,
    /// Source-relative path of a graph file; its directory becomes the
    /// tool's working directory instead of the document's.
    pub filename: Option<PathBuf>,
}

impl RenderRequest {
    pub fn new(source: impl Into<String>, format: ImageFormat) -> Self {
        Self {
            source: source.into(),
            options: RenderOptions::default(),
            format,
            prefix: DEFAULT_PREFIX.to_string(),
            filename: None,
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Location of a rendered image, both as seen from the referencing document
/// and on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedArtifact {
    pub relative_path: PathBuf,
    pub output_path: PathBuf,
}

impl RenderedArtifact {
    /// Relative path with `/` separators, ready for `src=` attributes.
    pub fn relative_uri(&self) -> String {
        to_posix(&self.relative_path)
    }

    /// Path of the client-side image map written next to raster output.
    pub fn map_path(&self) -> PathBuf {
        let mut path = self.output_path.clone().into_os_string();
        path.push(".map");
        PathBuf::from(path)
    }
}

/// Short graph forms that only carry a name and a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    Graph,
    Digraph,
}

impl GraphKind {
    pub fn keyword(self) -> &'static str {
        match self {
            GraphKind::Graph => "graph",
            GraphKind::Digraph => "digraph",
        }
    }
}

/// Wrap a bare statement list into a complete named graph.
pub fn wrap_simple_graph(kind: GraphKind, name: &str, body: &str) -> String {
    format!("{} {name} {{\n{body}\n}}\n", kind.keyword())
}

/// Failures surfaced by the render pipeline. An unavailable layout tool is not
/// an error: it yields no artifact instead.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("graphviz_dot executable path must be set! {tool:?}")]
    MissingTool { tool: String },
    #[error(
        "dot exited with error:\n[stderr]\n{}\n[stdout]\n{}",
        String::from_utf8_lossy(.stderr),
        String::from_utf8_lossy(.stdout)
    )]
    ToolFailed {
        exit_code: Option<i32>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    #[error(
        "dot did not produce an output file:\n[stderr]\n{}\n[stdout]\n{}",
        String::from_utf8_lossy(.stderr),
        String::from_utf8_lossy(.stdout)
    )]
    MissingOutput { stdout: Vec<u8>, stderr: Vec<u8> },
    #[error("failed to prepare image directory {}: {source}", .path.display())]
    OutputDir { path: PathBuf, source: io::Error },
    #[error("failed to exchange data with dot: {0}")]
    Io(io::Error),
    #[error("failed to post-process svg {}: {message}", .path.display())]
    Svg { path: PathBuf, message: String },
    #[error("Invalid clickable map file found: {path}")]
    MalformedMap { path: String },
    #[error("failed to read clickable map {}: {source}", .path.display())]
    MapRead { path: PathBuf, source: io::Error },
}

impl RenderError {
    pub(crate) fn svg(path: &Path, message: impl fmt::Display) -> Self {
        Self::Svg {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Seam between callers and the render pipeline.
///
/// `Ok(None)` means the layout tool cannot be run; callers fall back to
/// emitting the graph source.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<Option<RenderedArtifact>, RenderError>;
}

//! Graph rendering through an external Graphviz executable.
//!
//! Rendering is content-addressed: the output filename is derived from the
//! graph source, its options, the tool path and the tool arguments, and an
//! existing file under that name is reused without invoking the tool again.
//! Raster output comes with a clickable image map; vector output has its
//! relative links relocated to the image directory.

mod runtime;
mod service;
mod types;

pub use runtime::UnavailableTools;
pub use service::{ClickableMap, GraphvizRenderService, RenderPipelineConfig};
pub use types::{
    DEFAULT_PREFIX, DOCNAME_OPTION, GraphKind, ImageFormat, RenderError, RenderOptions,
    RenderRequest, RenderService, RenderedArtifact, TOOL_OPTION, UnknownImageFormat,
    wrap_simple_graph,
};

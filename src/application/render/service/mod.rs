mod config;
mod dot;
mod imagemap;
mod svg;

use std::{fs, path, time::Instant};

use metrics::counter;
use tracing::{debug, info, warn};

use crate::application::render::runtime::UnavailableTools;
use crate::application::render::types::{
    ImageFormat, RenderError, RenderRequest, RenderService, RenderedArtifact,
};

use self::dot::{DotInvocation, DotOutcome, cache_key, output_filename};

pub use config::RenderPipelineConfig;
pub use imagemap::ClickableMap;

/// Renders graphs through an external Graphviz executable and keeps the
/// results in the image directory, keyed by content.
///
/// A file already present under the derived name is returned as-is; there is
/// no staleness check beyond the name.
#[derive(Debug, Clone)]
pub struct GraphvizRenderService {
    config: RenderPipelineConfig,
    unavailable: UnavailableTools,
}

impl GraphvizRenderService {
    pub fn new(config: RenderPipelineConfig, unavailable: UnavailableTools) -> Self {
        Self {
            config,
            unavailable,
        }
    }

    pub fn config(&self) -> &RenderPipelineConfig {
        &self.config
    }

    pub fn unavailable_tools(&self) -> &UnavailableTools {
        &self.unavailable
    }

    fn resolve_tool<'a>(&'a self, request: &'a RenderRequest) -> Result<&'a str, RenderError> {
        let tool = request.options.tool().unwrap_or(&self.config.dot_path);
        if tool.trim().is_empty() {
            return Err(RenderError::MissingTool {
                tool: tool.to_string(),
            });
        }
        Ok(tool)
    }
}

impl RenderService for GraphvizRenderService {
    fn render(&self, request: &RenderRequest) -> Result<Option<RenderedArtifact>, RenderError> {
        let started_at = Instant::now();
        let tool = self.resolve_tool(request)?;
        let key = cache_key(&request.source, &request.options, tool, &self.config.dot_args);
        let filename = output_filename(&request.prefix, &key, request.format);

        let docname = request.options.docname();
        let image_root = self.config.image_root();
        let artifact = RenderedArtifact {
            relative_path: self.config.image_path_for(docname).join(&filename),
            output_path: image_root.join(&filename),
        };

        if artifact.output_path.is_file() {
            counter!("docgraph_render_cache_hit_total").increment(1);
            info!(
                target = "application::render::graphviz",
                op = "graphviz::render",
                result = "cache_hit",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                output = %artifact.output_path.display(),
                "Graph served from image cache"
            );
            return Ok(Some(artifact));
        }

        if self.unavailable.contains(tool) {
            debug!(
                target = "application::render::graphviz",
                op = "graphviz::render",
                result = "tool_unavailable",
                tool,
                "Skipping graph; dot command already failed to start"
            );
            return Ok(None);
        }

        fs::create_dir_all(&image_root).map_err(|source| RenderError::OutputDir {
            path: image_root.clone(),
            source,
        })?;

        // The tool runs in `cwd`; its output path must not be relative.
        let output = path::absolute(&artifact.output_path).map_err(RenderError::Io)?;
        let cwd = self
            .config
            .working_dir(request.filename.as_deref(), docname);
        let invocation = DotInvocation {
            tool,
            args: &self.config.dot_args,
            format: request.format,
            output: &output,
            cwd: &cwd,
        };

        match invocation.run(&request.source) {
            Ok(DotOutcome::Rendered) => {}
            Ok(DotOutcome::Unavailable(err)) => {
                self.unavailable.mark(tool);
                counter!("docgraph_render_tool_unavailable_total").increment(1);
                warn!(
                    target = "application::render::graphviz",
                    op = "graphviz::render",
                    result = "tool_unavailable",
                    tool,
                    cwd = %cwd.display(),
                    error = %err,
                    "dot command {tool:?} cannot be run (needed for graphviz output), check the graphviz_dot setting"
                );
                return Ok(None);
            }
            Err(err) => {
                counter!("docgraph_render_failure_total").increment(1);
                return Err(err);
            }
        }

        if request.format == ImageFormat::Svg {
            svg::fix_relative_paths(
                &artifact.output_path,
                &self.config.document_dir(docname),
                &image_root,
            )?;
        }

        counter!("docgraph_render_cache_miss_total").increment(1);
        info!(
            target = "application::render::graphviz",
            op = "graphviz::render",
            result = "cache_miss",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            output = %artifact.output_path.display(),
            "Graph rendered via dot"
        );

        Ok(Some(artifact))
    }
}

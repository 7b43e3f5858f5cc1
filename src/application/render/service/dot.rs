use std::{
    ffi::OsString,
    io::{self, ErrorKind, Write},
    path::Path,
    process::{Command, Stdio},
    thread,
    time::Instant,
};

use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::application::render::types::{ImageFormat, RenderError, RenderOptions};

/// Content-derived key identifying one rendering of a graph.
///
/// Covers everything that can change the produced image: the graph source,
/// the request options, the tool path and the extra tool arguments.
pub(crate) fn cache_key(
    source: &str,
    options: &RenderOptions,
    tool: &str,
    args: &[String],
) -> String {
    let mut hasher = Sha1::new();
    hasher.update(source.as_bytes());
    hasher.update(options.cache_repr().as_bytes());
    hasher.update(tool.as_bytes());
    hasher.update(format!("{args:?}").as_bytes());
    hex::encode(hasher.finalize())
}

pub(crate) fn output_filename(prefix: &str, key: &str, format: ImageFormat) -> String {
    format!("{prefix}-{key}.{}", format.extension())
}

/// One synchronous run of the layout tool.
pub(crate) struct DotInvocation<'a> {
    pub(crate) tool: &'a str,
    pub(crate) args: &'a [String],
    pub(crate) format: ImageFormat,
    pub(crate) output: &'a Path,
    pub(crate) cwd: &'a Path,
}

pub(crate) enum DotOutcome {
    /// The tool exited successfully and the output file exists.
    Rendered,
    /// The process could not be started at all.
    Unavailable(io::Error),
}

impl DotInvocation<'_> {
    fn command(&self) -> Command {
        let mut command = Command::new(self.tool);
        command
            .args(self.args)
            .arg(format!("-T{}", self.format.extension()))
            .arg(output_flag(self.output, None));
        if self.format.has_image_map() {
            command
                .arg("-Tcmapx")
                .arg(output_flag(self.output, Some(".map")));
        }
        command
            .current_dir(self.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    pub(crate) fn run(&self, source: &str) -> Result<DotOutcome, RenderError> {
        let started_at = Instant::now();
        let mut child = match self.command().spawn() {
            Ok(child) => child,
            Err(err) => return Ok(DotOutcome::Unavailable(err)),
        };

        // Stdin is fed from its own thread while stdout and stderr are drained.
        let stdin = child.stdin.take();
        let (output, written) = thread::scope(|scope| {
            let writer =
                stdin.map(|mut stdin| scope.spawn(move || stdin.write_all(source.as_bytes())));
            let output = child.wait_with_output();
            let written = match writer {
                Some(handle) => handle
                    .join()
                    .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked"))),
                None => Ok(()),
            };
            (output, written)
        });
        let output = output.map_err(RenderError::Io)?;
        match written {
            Ok(()) => {}
            // The tool may exit before draining stdin; its status tells the story.
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {}
            Err(err) => return Err(RenderError::Io(err)),
        }

        let elapsed_ms = started_at.elapsed().as_millis() as u64;

        if !output.status.success() {
            let exit_code = output.status.code();
            warn!(
                target = "application::render::graphviz",
                op = "dot::run",
                result = "error",
                elapsed_ms,
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                error_code = "dot_exit",
                stderr = %String::from_utf8_lossy(&output.stderr),
                "dot exited with error"
            );
            return Err(RenderError::ToolFailed {
                exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        if !self.output.is_file() {
            warn!(
                target = "application::render::graphviz",
                op = "dot::run",
                result = "error",
                elapsed_ms,
                error_code = "dot_no_output",
                output = %self.output.display(),
                "dot did not produce an output file"
            );
            return Err(RenderError::MissingOutput {
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        debug!(
            target = "application::render::graphviz",
            op = "dot::run",
            result = "ok",
            elapsed_ms,
            output = %self.output.display(),
            "dot finished"
        );
        Ok(DotOutcome::Rendered)
    }
}

fn output_flag(output: &Path, suffix: Option<&str>) -> OsString {
    let mut flag = OsString::from("-o");
    flag.push(output);
    if let Some(suffix) = suffix {
        flag.push(suffix);
    }
    flag
}

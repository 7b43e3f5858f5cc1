//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::render::ImageFormat;

mod cli;

pub use cli::{
    CliArgs, Command, InspectArgs, LoggingOverrides, RenderArgs, RenderOverrides, SimpleGraphKind,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "docgraph";
const ENV_PREFIX: &str = "DOCGRAPH";
pub(crate) const DEFAULT_DOT_PATH: &str = "dot";
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "_build/html";
pub(crate) const DEFAULT_IMAGE_DIR: &str = "_images";
pub(crate) const DEFAULT_SOURCE_DIR: &str = ".";
const DEFAULT_OUTPUT_FORMAT: ImageFormat = ImageFormat::Png;

/// Fully validated application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Checked when rendering, not here: an empty path is a render-time error.
    pub dot_path: String,
    pub dot_args: Vec<String>,
    pub output_format: ImageFormat,
    pub output_dir: PathBuf,
    pub image_dir: PathBuf,
    pub source_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("render.dot_args")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Render(args)) => raw.apply_render_overrides(&args.overrides),
        Some(Command::Inspect(args)) => raw.apply_logging_overrides(&args.logging),
        None => {}
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    dot_path: Option<String>,
    dot_args: Option<Vec<String>>,
    output_format: Option<String>,
    output_dir: Option<PathBuf>,
    image_dir: Option<PathBuf>,
    source_dir: Option<PathBuf>,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        self.apply_logging_overrides(&overrides.logging);

        if let Some(path) = overrides.dot_path.as_ref() {
            self.render.dot_path = Some(path.clone());
        }
        if !overrides.dot_args.is_empty() {
            self.render.dot_args = Some(overrides.dot_args.clone());
        }
        if let Some(format) = overrides.output_format.as_ref() {
            self.render.output_format = Some(format.clone());
        }
        if let Some(dir) = overrides.output_dir.as_ref() {
            self.render.output_dir = Some(dir.clone());
        }
        if let Some(dir) = overrides.image_dir.as_ref() {
            self.render.image_dir = Some(dir.clone());
        }
        if let Some(dir) = overrides.source_dir.as_ref() {
            self.render.source_dir = Some(dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings { logging, render } = raw;

        let logging = build_logging_settings(logging)?;
        let render = build_render_settings(render)?;

        Ok(Self { logging, render })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let output_format = match render.output_format {
        Some(value) => match ImageFormat::from_str(value.trim()) {
            Ok(format @ (ImageFormat::Png | ImageFormat::Svg)) => format,
            _ => {
                return Err(LoadError::invalid(
                    "render.output_format",
                    format!("expected `png` or `svg`, got `{value}`"),
                ));
            }
        },
        None => DEFAULT_OUTPUT_FORMAT,
    };

    let output_dir = render
        .output_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    if output_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.output_dir",
            "path must not be empty",
        ));
    }

    let image_dir = render
        .image_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE_DIR));
    if image_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.image_dir",
            "path must not be empty",
        ));
    }
    if image_dir.is_absolute() {
        return Err(LoadError::invalid(
            "render.image_dir",
            "path must be relative to the output directory",
        ));
    }

    let source_dir = render
        .source_dir
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR));

    Ok(RenderSettings {
        dot_path: render
            .dot_path
            .unwrap_or_else(|| DEFAULT_DOT_PATH.to_string()),
        dot_args: render.dot_args.unwrap_or_default(),
        output_format,
        output_dir,
        image_dir,
        source_dir,
    })
}

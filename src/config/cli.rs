use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the docgraph binary.
#[derive(Debug, Parser)]
#[command(
    name = "docgraph",
    version,
    about = "Cached Graphviz rendering and inventory inspection"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "DOCGRAPH_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a graph through the layout tool, reusing cached output.
    Render(Box<RenderArgs>),
    /// Print out an inventory file.
    Inspect(InspectArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: RenderOverrides,

    /// Graph source file; its directory becomes the tool's working directory.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Treat FILE as the body of a simple graph of this kind.
    #[arg(long, value_enum, requires = "name")]
    pub kind: Option<SimpleGraphKind>,

    /// Name of the simple graph built with --kind.
    #[arg(long, value_name = "NAME", requires = "kind")]
    pub name: Option<String>,

    /// Layout program for this graph, overriding the configured dot path.
    #[arg(long, value_name = "PROGRAM")]
    pub layout: Option<String>,

    /// Name of the referencing document, without suffix.
    #[arg(long, value_name = "DOCNAME", default_value = "index")]
    pub docname: String,

    /// Output filename prefix.
    #[arg(long, value_name = "PREFIX", default_value = "graphviz")]
    pub prefix: String,
}

#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Local path or URL of the inventory.
    #[arg(value_name = "LOCATION")]
    pub location: Option<String>,

    /// Print the decoded inventory as JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SimpleGraphKind {
    Graph,
    Digraph,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the default layout executable.
    #[arg(long = "dot-path", value_name = "PATH")]
    pub dot_path: Option<String>,

    /// Extra argument passed to the layout executable; repeatable.
    #[arg(long = "dot-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub dot_args: Vec<String>,

    /// Override the output format (png|svg).
    #[arg(long = "output-format", value_name = "FORMAT")]
    pub output_format: Option<String>,

    /// Override the build output directory.
    #[arg(long = "output-dir", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Override the image directory, relative to the output directory.
    #[arg(long = "image-dir", value_name = "DIR")]
    pub image_dir: Option<PathBuf>,

    /// Override the documentation source directory.
    #[arg(long = "source-dir", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub source_dir: Option<PathBuf>,
}

use std::{
    fs,
    io::{self, Write},
    process::ExitCode,
};

use clap::CommandFactory;
use docgraph::{
    application::{
        error::AppError,
        inventory::inspect_main,
        render::{
            ClickableMap, GraphKind, GraphvizRenderService, RenderOptions, RenderPipelineConfig,
            RenderRequest, RenderService, UnavailableTools, wrap_simple_graph,
        },
    },
    config::{self, CliArgs, Command, InspectArgs, RenderArgs, SimpleGraphKind},
    infra::{error::InfraError, fetch::LocationFetcher, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            report_application_error(&error);
            ExitCode::FAILURE
        }
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<ExitCode, AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let Some(command) = cli_args.command else {
        let _ = writeln!(io::stderr(), "{}", CliArgs::command().render_help());
        return Ok(ExitCode::FAILURE);
    };

    telemetry::init(&settings.logging)?;

    match command {
        Command::Render(args) => run_render(&settings, &args),
        Command::Inspect(args) => run_inspect(args).await,
    }
}

fn run_render(settings: &config::Settings, args: &RenderArgs) -> Result<ExitCode, AppError> {
    let body = fs::read_to_string(&args.input).map_err(InfraError::from)?;

    let mut request = match (args.kind, args.name.as_deref()) {
        (Some(kind), Some(name)) => {
            let kind = match kind {
                SimpleGraphKind::Graph => GraphKind::Graph,
                SimpleGraphKind::Digraph => GraphKind::Digraph,
            };
            RenderRequest::new(
                wrap_simple_graph(kind, name, body.trim_end()),
                settings.render.output_format,
            )
        }
        (None, None) => RenderRequest::new(body, settings.render.output_format)
            .with_filename(args.input.clone()),
        _ => return Err(AppError::validation("--kind and --name must be given together")),
    };

    let mut options = RenderOptions::new().with_docname(args.docname.clone());
    if let Some(layout) = args.layout.as_ref() {
        options = options.with_tool(layout.clone());
    }
    request = request.with_options(options).with_prefix(args.prefix.clone());

    let service = GraphvizRenderService::new(
        RenderPipelineConfig::from(&settings.render),
        UnavailableTools::new(),
    );

    let mut stdout = io::stdout().lock();
    match service.render(&request) {
        Ok(Some(artifact)) => {
            writeln!(stdout, "{}", artifact.relative_uri()).map_err(InfraError::from)?;
            if request.format.has_image_map() {
                match ClickableMap::from_file(&artifact.map_path(), &request.source) {
                    Ok(map) if map.is_clickable() => {
                        writeln!(stdout, "{}", map.generate_clickable_map())
                            .map_err(InfraError::from)?;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(
                            target = "docgraph::render",
                            op = "graphviz::imagemap",
                            error = %err,
                            "dot code {:?}: {err}",
                            request.source
                        );
                        return Ok(ExitCode::FAILURE);
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => {
            stdout
                .write_all(request.source.as_bytes())
                .map_err(InfraError::from)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            warn!(
                target = "docgraph::render",
                op = "graphviz::render",
                error = %err,
                "dot code {:?}: {err}",
                request.source
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_inspect(args: InspectArgs) -> Result<ExitCode, AppError> {
    let fetcher = LocationFetcher::new()?;
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let code = inspect_main(
        &fetcher,
        args.location.as_deref(),
        args.json,
        &mut stdout,
        &mut stderr,
    )
    .await;
    Ok(ExitCode::from(code))
}

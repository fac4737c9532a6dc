//! stagehand: drive declared-parameter image pipelines from the command line.
//!
//! Loads an image, builds a pipeline (the reference gray -> dilate -> edges
//! list, a list of named presets, or a JSON definition) and renders it
//! through the headless toolkit. Every displayed image is written as PNG;
//! per-stage diagnostics go to stdout.
//!
//! # Usage
//!
//! ```text
//! stagehand run photo.jpg --stages gray,blur,edges --set Canny.threshold1=50
//! stagehand interactive photo.jpg --session controls.json --save-session
//! stagehand codes
//! stagehand dump --stages gray,lines
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod error;
mod interactive;
mod output;
mod session;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use stagehand_pipeline::presets::PRESET_NAMES;
use stagehand_pipeline::{ColorCatalog, ControlState, PipelineDefinition};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CliError;
use crate::session::{PipelineSource, Session};

/// Interactive image-processing pipelines from declared operation
/// parameters.
#[derive(Parser)]
#[command(name = "stagehand", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` wins.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the pipeline once and write the displayed images.
    Run(RenderArgs),
    /// Read `set KEY VALUE` commands from stdin, re-rendering after each.
    Interactive(RenderArgs),
    /// List the color conversion codes offered by `cvtColor`.
    Codes,
    /// Print the pipeline as a JSON definition.
    Dump(PipelineArgs),
}

/// Which pipeline to build.
#[derive(Args)]
struct PipelineArgs {
    /// Comma-separated preset names (gray, blur, lines, dilate, edges).
    #[arg(long, value_delimiter = ',', conflicts_with = "pipeline")]
    stages: Vec<String>,

    /// JSON pipeline definition file.
    #[arg(long, value_name = "FILE")]
    pipeline: Option<PathBuf>,
}

impl PipelineArgs {
    fn source(&self) -> PipelineSource {
        match (&self.pipeline, self.stages.is_empty()) {
            (Some(path), _) => PipelineSource::Definition(path.clone()),
            (None, false) => PipelineSource::Presets(self.stages.clone()),
            (None, true) => PipelineSource::Reference,
        }
    }
}

#[derive(Args)]
struct RenderArgs {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Control-state file to resume from.
    #[arg(long, value_name = "FILE")]
    session: Option<PathBuf>,

    /// Rewrite the session file after every successful pass.
    #[arg(long, requires = "session")]
    save_session: bool,

    /// Override a control, e.g. `Canny.threshold1=50`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Directory the displayed images are written to.
    #[arg(long, value_name = "DIR", default_value = "stagehand-out")]
    out: PathBuf,

    /// Print diagnostics as JSON instead of a report.
    #[arg(long)]
    json: bool,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load the image, pipeline and control state described by `args`.
fn open_session(args: &RenderArgs, catalog: &ColorCatalog) -> Result<Session, CliError> {
    let bytes = std::fs::read(&args.image_path).map_err(|e| CliError::io(&args.image_path, e))?;
    eprintln!("Image: {} ({} bytes)", args.image_path.display(), bytes.len());
    let source = stagehand_pipeline::decode(&bytes)?;
    let pipeline = args.pipeline.source().build(catalog)?;

    let state = match &args.session {
        Some(path) => session::load_state(path)?,
        None => ControlState::new(),
    };
    let mut session = Session::new(source, pipeline, state);
    for text in &args.overrides {
        let (key, value) = session::parse_override(text)?;
        session.set(key, value);
    }
    Ok(session)
}

/// Write images, diagnostics and state for the last successful pass.
fn publish(args: &RenderArgs, session: &Session) -> Result<(), CliError> {
    let Some(pass) = session.last() else {
        return Ok(());
    };
    let written = output::write_panels(&args.out, &pass.panels)?;
    eprintln!("Wrote {} images to {}", written.len(), args.out.display());
    println!("{}", output::format_diagnostics(&pass.diagnostics, args.json)?);
    if args.save_session
        && let Some(path) = &args.session
    {
        session::save_state(path, session.ui().state())?;
    }
    Ok(())
}

fn run(args: &RenderArgs, catalog: &ColorCatalog) -> Result<(), CliError> {
    let mut session = open_session(args, catalog)?;
    session.pass()?;
    publish(args, &session)
}

fn interactive(args: &RenderArgs, catalog: &ColorCatalog) -> Result<(), CliError> {
    let mut session = open_session(args, catalog)?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut sink = |session: &Session| publish(args, session);
    interactive::run(&mut session, stdin.lock(), &mut stdout, &mut sink)
}

fn codes(catalog: &ColorCatalog) {
    for (label, code) in catalog.entries() {
        println!("{label:<24} {code}");
    }
}

fn dump(args: &PipelineArgs, catalog: &ColorCatalog) -> Result<(), CliError> {
    let pipeline = args.source().build(catalog)?;
    println!("{}", PipelineDefinition::describe(&pipeline)?.to_json()?);
    Ok(())
}

/// Whether `path` names a preset rather than a file, for friendlier errors.
fn looks_like_preset(path: &Path) -> bool {
    path.to_str().is_some_and(|s| PRESET_NAMES.contains(&s))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let catalog = ColorCatalog::builtin();
    let result = match &cli.command {
        Command::Run(args) => run(args, &catalog),
        Command::Interactive(args) => interactive(args, &catalog),
        Command::Codes => {
            codes(&catalog);
            Ok(())
        }
        Command::Dump(args) => dump(args, &catalog),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let CliError::Io { path, .. } = &e
                && looks_like_preset(path)
            {
                eprintln!("hint: pass preset names with --stages {}", path.display());
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn stages_select_presets() {
        let cli = Cli::parse_from(["stagehand", "dump", "--stages", "gray,edges"]);
        let Command::Dump(args) = cli.command else {
            unreachable!("parsed dump");
        };
        assert_eq!(
            args.source(),
            PipelineSource::Presets(vec!["gray".into(), "edges".into()])
        );
    }

    #[test]
    fn no_selection_means_reference() {
        let cli = Cli::parse_from(["stagehand", "run", "photo.png", "-vv", "--set", "a.b=1"]);
        assert_eq!(cli.verbose, 2);
        let Command::Run(args) = cli.command else {
            unreachable!("parsed run");
        };
        assert_eq!(args.pipeline.source(), PipelineSource::Reference);
        assert_eq!(args.overrides, vec!["a.b=1"]);
    }

    #[test]
    fn stages_and_pipeline_conflict() {
        let result = Cli::try_parse_from([
            "stagehand",
            "dump",
            "--stages",
            "gray",
            "--pipeline",
            "p.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn save_session_requires_session() {
        assert!(Cli::try_parse_from(["stagehand", "run", "a.png", "--save-session"]).is_err());
    }

    #[test]
    fn preset_names_are_recognized_in_paths() {
        assert!(looks_like_preset(Path::new("edges")));
        assert!(!looks_like_preset(Path::new("edges.png")));
    }
}

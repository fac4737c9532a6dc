//! One loaded image, one pipeline and the headless toolkit driving it.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use stagehand_pipeline::headless::Panel;
use stagehand_pipeline::{
    Clock, ColorCatalog, ControlState, ControlValue, Frame, HeadlessUi, PassDiagnostics, Pipeline,
    PipelineDefinition, Ui, presets,
};

use crate::error::CliError;

/// Caption and container header for the source image.
pub const UPLOADED: &str = "Uploaded Image";

/// [`Clock`] implementation backed by [`std::time::Instant`].
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// How the pipeline is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSource {
    /// The reference stage list.
    Reference,
    /// Preset names, in order.
    Presets(Vec<String>),
    /// A JSON definition file.
    Definition(PathBuf),
}

impl PipelineSource {
    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Io`] for an unreadable definition file or
    /// [`CliError::Pipeline`] for a bad definition or preset name.
    pub fn build(&self, catalog: &ColorCatalog) -> Result<Pipeline, CliError> {
        match self {
            Self::Reference => Ok(presets::reference_pipeline(catalog)?),
            Self::Presets(names) => Ok(presets::pipeline_from_names(
                names.iter().map(String::as_str),
                catalog,
            )?),
            Self::Definition(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
                Ok(PipelineDefinition::from_json(&text)?.build(catalog)?)
            }
        }
    }
}

/// Parse a `--set KEY=VALUE` override.
///
/// # Errors
///
/// Returns [`CliError::Override`] if there is no `=` or the key is empty.
pub fn parse_override(text: &str) -> Result<(String, ControlValue), CliError> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), ControlValue::parse(value)))
        }
        _ => Err(CliError::Override(text.to_string())),
    }
}

/// Read a control-state file. A missing file is an empty state.
///
/// # Errors
///
/// Returns [`CliError::Io`] if the file exists but cannot be read and
/// [`CliError::Session`] if it is not valid JSON.
pub fn load_state(path: &Path) -> Result<ControlState, CliError> {
    match std::fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).map_err(|source| CliError::Session {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no session file yet; starting fresh");
            Ok(ControlState::new())
        }
        Err(e) => Err(CliError::io(path, e)),
    }
}

/// Write a control-state file.
///
/// # Errors
///
/// Returns [`CliError::Json`] or [`CliError::Io`].
pub fn save_state(path: &Path, state: &ControlState) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json).map_err(|e| CliError::io(path, e))
}

/// Result of one successful pass.
#[derive(Debug)]
pub struct PassOutput {
    /// Final frame of the pipeline.
    pub frame: Frame,
    /// Everything displayed, source image first.
    pub panels: Vec<Panel>,
    /// Per-stage timing and shapes.
    pub diagnostics: PassDiagnostics,
}

/// A source image, a pipeline and the toolkit that drives it.
#[derive(Debug)]
pub struct Session {
    source: Frame,
    pipeline: Pipeline,
    ui: HeadlessUi,
    last: Option<PassOutput>,
}

impl Session {
    /// Start a session over `source`, resuming from `state`.
    pub fn new(source: Frame, pipeline: Pipeline, state: ControlState) -> Self {
        Self {
            source,
            pipeline,
            ui: HeadlessUi::with_state(state),
            last: None,
        }
    }

    /// Override a control for the next pass.
    pub fn set(&mut self, key: impl Into<String>, value: ControlValue) {
        self.ui.set(key, value);
    }

    /// The toolkit, for inspecting controls and state.
    pub const fn ui(&self) -> &HeadlessUi {
        &self.ui
    }

    /// The most recent successful pass.
    pub const fn last(&self) -> Option<&PassOutput> {
        self.last.as_ref()
    }

    /// Run one full render pass.
    ///
    /// On failure the previous successful pass is kept as [`Session::last`].
    ///
    /// # Errors
    ///
    /// Returns the first stage error.
    pub fn pass(&mut self) -> Result<&PassOutput, CliError> {
        self.ui.begin_pass();
        let region = self.ui.container(UPLOADED);
        self.ui.image(region, &self.source, UPLOADED);

        let (frame, diagnostics) =
            self.pipeline
                .render_with_diagnostics(&mut self.ui, self.source.clone(), &StdClock)?;
        let panels = self.ui.take_panels();
        tracing::info!(output = %frame.describe(), "pass complete");
        Ok(&*self.last.insert(PassOutput {
            frame,
            panels,
            diagnostics,
        }))
    }
}

//! Pipelines: ordered stages sharing one evolving frame.
//!
//! A render pass walks the stages top to bottom, handing each stage's
//! output to the next. Nothing is cached between passes; every event
//! re-runs everything. A pass is all-or-nothing: the first failing stage
//! ends it and later stages do not run.

use crate::diagnostics::{Clock, PassDiagnostics, StageDiagnostics};
use crate::runner::StageRunner;
use crate::stage::Stage;
use crate::types::{Frame, PipelineError};
use crate::ui::Ui;

/// An ordered list of stages.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// A pipeline over `stages`, in order.
    #[must_use]
    pub const fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Append a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// The stages, in order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The stages, mutably.
    pub fn stages_mut(&mut self) -> &mut [Stage] {
        &mut self.stages
    }

    /// Number of stages.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage with its current parameter values, without a UI.
    ///
    /// Equivalent to chaining [`Stage::run`] by hand.
    ///
    /// # Errors
    ///
    /// Returns the first stage error.
    pub fn run_all(&self, image: Frame) -> Result<Frame, PipelineError> {
        self.stages.iter().try_fold(image, |frame, stage| stage.run(&frame))
    }

    /// Perform one render pass through `ui`.
    ///
    /// # Errors
    ///
    /// Returns the first stage error; later stages are not drawn.
    pub fn render<U: Ui + ?Sized>(&mut self, ui: &mut U, image: Frame) -> Result<Frame, PipelineError> {
        tracing::info!(stages = self.stages.len(), "render pass");
        let mut frame = image;
        for stage in &mut self.stages {
            frame = StageRunner::new(stage).render(ui, frame)?;
            tracing::debug!(stage = stage.name(), output = %frame.describe(), "stage rendered");
        }
        Ok(frame)
    }

    /// Perform one render pass and collect per-stage diagnostics.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::render`].
    pub fn render_with_diagnostics<U, C>(
        &mut self,
        ui: &mut U,
        image: Frame,
        clock: &C,
    ) -> Result<(Frame, PassDiagnostics), PipelineError>
    where
        U: Ui + ?Sized,
        C: Clock,
    {
        tracing::info!(stages = self.stages.len(), "render pass");
        let pass_start = clock.now();
        let mut stages = Vec::with_capacity(self.stages.len());
        let mut frame = image;
        for stage in &mut self.stages {
            let start = clock.now();
            let input = frame.clone();
            frame = StageRunner::new(stage).render(ui, frame)?;
            let duration = clock.elapsed(&start);
            let kwargs = stage.kwargs()?;
            tracing::debug!(
                stage = stage.name(),
                output = %frame.describe(),
                ms = duration.as_secs_f64() * 1000.0,
                "stage rendered",
            );
            stages.push(StageDiagnostics::new(stage.name(), duration, &input, &frame, &kwargs));
        }
        let diagnostics = PassDiagnostics {
            stages,
            total_duration: clock.elapsed(&pass_start),
        };
        Ok((frame, diagnostics))
    }
}

impl FromIterator<Stage> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

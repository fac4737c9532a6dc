//! Rendering one stage into a UI.

use crate::stage::Stage;
use crate::types::{Frame, PipelineError};
use crate::ui::{Region, Ui};

/// Column order inside a stage container.
const INPUT: usize = 0;
const OUTPUT: usize = 1;
const CONTROLS: usize = 2;

/// Draws one [`Stage`] for a render pass.
///
/// Holds no state of its own: parameter values live in the stage and the
/// toolkit remembers what the user chose between passes.
#[derive(Debug)]
pub struct StageRunner<'a> {
    stage: &'a mut Stage,
}

impl<'a> StageRunner<'a> {
    /// Wrap `stage` for one render.
    pub const fn new(stage: &'a mut Stage) -> Self {
        Self { stage }
    }

    /// Render the stage and return its output.
    ///
    /// Opens a container titled with the stage name, split into input,
    /// output and controls columns. Every parameter draws its control and
    /// adopts the toolkit's value before the stage runs; then the input
    /// and output are shown side by side.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] before binding anything
    /// if the parameter list holds an unrecognized entry, or whatever
    /// [`Stage::run`] fails with.
    pub fn render<U: Ui + ?Sized>(&mut self, ui: &mut U, image: Frame) -> Result<Frame, PipelineError> {
        let name = self.stage.name().to_string();
        let container = ui.container(&name);
        let columns = ui.columns(container, 3);
        let column = |index: usize| -> Region { columns.get(index).copied().unwrap_or(container) };

        self.stage.validate()?;
        for param in self.stage.params_mut() {
            param.render(ui, column(CONTROLS));
        }

        let output = self.stage.run(&image)?;
        ui.image(column(INPUT), &image, &format!("{name} input"));
        ui.image(column(OUTPUT), &output, &format!("{name} output"));
        Ok(output)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::headless::{ControlValue, HeadlessUi};
    use crate::operation::OperationKind;
    use crate::param::{Param, Value};
    use crate::stage::ParamEntry;
    use crate::types::GrayImage;

    fn dot() -> Frame {
        Frame::from(GrayImage::from_fn(9, 9, |x, y| {
            image::Luma([if (x, y) == (4, 4) { 255 } else { 0 }])
        }))
    }

    fn dilate_stage() -> Stage {
        Stage::new(
            OperationKind::Dilate,
            vec![
                Param::pair("kernel", (3, 3), (1, 255), 2).unwrap(),
                Param::int("iterations", 1, (1, 10), 1).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn binds_controls_before_running() {
        let mut stage = dilate_stage();
        let mut ui = HeadlessUi::new();
        ui.set("dilate.kernel", ControlValue::Int(5));
        let out = StageRunner::new(&mut stage).render(&mut ui, dot()).unwrap();

        assert_eq!(stage.param("kernel").unwrap().extract(), Value::Pair(5, 5));
        assert_eq!(out, stage.run(&dot()).unwrap());
        let lit = out.as_image().unwrap().to_luma8().pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(lit, 25);
    }

    #[test]
    fn toolkit_reports_the_value_the_stage_ran_with() {
        let mut stage = dilate_stage();
        let mut ui = HeadlessUi::new();
        ui.set("dilate.kernel", ControlValue::Int(4));
        let out = StageRunner::new(&mut stage).render(&mut ui, dot()).unwrap();

        assert_eq!(stage.param("kernel").unwrap().extract(), Value::Pair(3, 3));
        assert_eq!(ui.state().get("dilate.kernel"), Some(&ControlValue::Int(3)));
        let widget = ui.widgets().iter().find(|w| w.key == "dilate.kernel").unwrap();
        assert_eq!(widget.value, ControlValue::Int(3));
        let lit = out.as_image().unwrap().to_luma8().pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(lit, 9);
    }

    #[test]
    fn shows_input_and_output_captioned_with_stage_name() {
        let mut stage = dilate_stage().with_label("grow");
        let mut ui = HeadlessUi::new();
        let out = StageRunner::new(&mut stage).render(&mut ui, dot()).unwrap();
        let panels = ui.take_panels();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].header, "grow");
        assert_eq!(panels[0].images[0].caption, "grow input");
        assert_eq!(panels[0].images[0].frame, dot());
        assert_eq!(panels[0].images[1].caption, "grow output");
        assert_eq!(panels[0].images[1].frame, out);
        let keys: Vec<&str> = ui.widgets().iter().map(|w| w.key.as_str()).collect();
        assert_eq!(keys, vec!["grow.kernel", "grow.iterations"]);
    }

    #[test]
    fn invalid_entry_binds_nothing() {
        let mut stage = Stage::with_entries(
            Arc::new(OperationKind::Dilate),
            vec![
                ParamEntry::Declared(Param::pair("kernel", (3, 3), (1, 255), 2).unwrap()),
                ParamEntry::Unrecognized(serde_json::json!(7)),
            ],
        )
        .unwrap();
        let mut ui = HeadlessUi::new();
        ui.set("dilate.kernel", ControlValue::Int(9));
        let err = StageRunner::new(&mut stage).render(&mut ui, dot()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { .. }));
        assert_eq!(stage.param("kernel").unwrap().extract(), Value::Pair(3, 3));
        assert!(ui.widgets().is_empty());
    }
}

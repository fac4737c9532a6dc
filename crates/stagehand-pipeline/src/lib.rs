//! stagehand-pipeline: interactive image pipelines built from declared
//! operation parameters.
//!
//! A native image function is wrapped into a [`Stage`] together with a
//! list of [`Param`]s. Each parameter knows how to draw itself as a UI
//! control and how to turn the control's value into a keyword argument,
//! so no per-function UI code is needed:
//!
//! declared parameter -> UI control -> typed value -> function call
//!
//! A [`Pipeline`] chains stages over one evolving [`Frame`]. Every render
//! pass re-runs the whole chain through a [`Ui`] implementation; the
//! toolkit, not the pipeline, remembers what the user chose.
//!
//! The crate is sans-IO: images come in as bytes ([`decode`]) and leave as
//! [`Frame`]s. [`HeadlessUi`] is a toolkit that answers widgets from a
//! stored control state, for batch and scripted use.

pub mod blur;
pub mod canny;
pub mod color;
pub mod decode;
pub mod definition;
pub mod diagnostics;
mod filter;
pub mod headless;
pub mod hough;
pub mod kwargs;
pub mod morphology;
pub mod operation;
pub mod param;
pub mod pipeline;
pub mod presets;
pub mod runner;
pub mod stage;
pub mod types;
pub mod ui;

pub use color::ColorCatalog;
pub use decode::decode;
pub use definition::{ParamDecl, PipelineDefinition, StageDefinition};
pub use diagnostics::{Clock, PassDiagnostics, StageDiagnostics};
pub use headless::{ControlState, ControlValue, HeadlessUi};
pub use kwargs::Kwargs;
pub use operation::{Operation, OperationError, OperationKind, from_fn};
pub use param::{Param, Value};
pub use pipeline::Pipeline;
pub use runner::StageRunner;
pub use stage::{ParamEntry, Stage};
pub use types::{Dimensions, DynamicImage, Frame, GrayImage, LineSegment, PipelineError};
pub use ui::{Checkbox, Region, Select, Slider, Ui};

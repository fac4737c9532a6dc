//! The UI toolkit seam.
//!
//! A render pass calls into a [`Ui`] synchronously: every widget call
//! draws (or pretends to draw) a control and immediately returns the
//! control's current value. The toolkit, not the pipeline, remembers what
//! the user last chose for each widget between passes.
//!
//! Layout is expressed through opaque [`Region`] handles issued by the
//! toolkit: a [`container`](Ui::container) per stage, split into
//! [`columns`](Ui::columns).

use crate::types::Frame;

/// Opaque handle to a layout region issued by a [`Ui`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region(u32);

impl Region {
    /// Wrap a toolkit-specific region id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The toolkit-specific region id.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

/// An integer range slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slider<'a> {
    /// Widget label, also the parameter name.
    pub label: &'a str,
    /// Optional help text shown next to the control.
    pub help: Option<&'a str>,
    /// Pre-selected value.
    pub value: i64,
    /// Inclusive lower bound.
    pub min: i64,
    /// Inclusive upper bound.
    pub max: i64,
    /// Step between selectable values.
    pub step: i64,
}

/// A boolean toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkbox<'a> {
    /// Widget label, also the parameter name.
    pub label: &'a str,
    /// Optional help text shown next to the control.
    pub help: Option<&'a str>,
    /// Pre-selected state.
    pub value: bool,
}

/// A single-choice selection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Select<'a> {
    /// Widget label, also the parameter name.
    pub label: &'a str,
    /// Optional help text shown next to the control.
    pub help: Option<&'a str>,
    /// Visible options, in display order.
    pub options: &'a [&'a str],
    /// Index of the pre-selected option.
    pub index: usize,
}

/// Primitive widgets a render pass draws into.
///
/// All methods are synchronous call-and-return within one pass.
pub trait Ui {
    /// Open a bordered container titled `header` and return its region.
    fn container(&mut self, header: &str) -> Region;

    /// Split `parent` into `count` side-by-side columns.
    fn columns(&mut self, parent: Region, count: usize) -> Vec<Region>;

    /// Draw a slider and return its current value.
    fn slider(&mut self, region: Region, slider: &Slider<'_>) -> i64;

    /// Draw a checkbox and return its current state.
    fn checkbox(&mut self, region: Region, checkbox: &Checkbox<'_>) -> bool;

    /// Draw a select list and return the currently selected option.
    fn select(&mut self, region: Region, select: &Select<'_>) -> String;

    /// Display a frame with a caption.
    fn image(&mut self, region: Region, frame: &Frame, caption: &str);
}

//! Declared parameters.
//!
//! A [`Param`] is a named, typed value with a validity domain that knows
//! how to draw itself as a UI control ([`Param::render`]) and how to turn
//! its current value into a keyword argument ([`Param::extract`]). The set
//! of variants is closed: integer slider, boolean checkbox, paired-integer
//! slider and enumerated select.
//!
//! Construction validates the declared default against the domain and
//! fails with [`PipelineError::Configuration`]. After every render pass the
//! current value is back inside the domain, whatever the toolkit returned.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::definition::ParamDecl;
use crate::types::PipelineError;
use crate::ui::{Checkbox, Region, Select, Slider, Ui};

/// A keyword argument value extracted from a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// An integer, also used for enum backing values.
    Int(i64),
    /// A boolean flag.
    Bool(bool),
    /// An integer pair such as a kernel size.
    Pair(i64, i64),
}

impl Value {
    /// Name of the value's type, for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "an integer",
            Self::Bool(_) => "a boolean",
            Self::Pair(..) => "an integer pair",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Pair(a, b) => write!(f, "({a}, {b})"),
        }
    }
}

/// Inclusive integer domain with a step grid anchored at `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    /// Inclusive lower bound.
    pub min: i64,
    /// Inclusive upper bound.
    pub max: i64,
    /// Distance between selectable values.
    pub step: i64,
}

impl IntRange {
    /// Validate and build a range for the parameter `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if `min > max` or
    /// `step < 1`.
    pub fn new(name: &str, (min, max): (i64, i64), step: i64) -> Result<Self, PipelineError> {
        if min > max {
            return Err(PipelineError::configuration(
                name,
                format!("range minimum {min} exceeds maximum {max}"),
            ));
        }
        if step < 1 {
            return Err(PipelineError::configuration(
                name,
                format!("step must be at least 1, got {step}"),
            ));
        }
        Ok(Self { min, max, step })
    }

    /// Whether `value` lies inside the domain and on the step grid.
    #[must_use]
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
            && (i128::from(value) - i128::from(self.min)) % i128::from(self.step) == 0
    }

    /// Clamp `value` into `[min, max]` and snap it down onto the step grid.
    #[must_use]
    pub fn conform(&self, value: i64) -> i64 {
        let clamped = value.clamp(self.min, self.max);
        let offset = i128::from(clamped) - i128::from(self.min);
        let snapped = i128::from(self.min) + offset / i128::from(self.step) * i128::from(self.step);
        i64::try_from(snapped).unwrap_or(clamped)
    }

    fn check_default(&self, name: &str, value: i64) -> Result<(), PipelineError> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(PipelineError::configuration(
                name,
                format!(
                    "default {value} is not in [{}, {}] with step {}",
                    self.min, self.max, self.step
                ),
            ))
        }
    }
}

/// Integer parameter drawn as a slider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntParam {
    name: String,
    help: Option<String>,
    value: i64,
    range: IntRange,
}

impl IntParam {
    /// Current value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }

    /// Declared domain.
    #[must_use]
    pub const fn range(&self) -> IntRange {
        self.range
    }
}

/// Boolean parameter drawn as a checkbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolParam {
    name: String,
    help: Option<String>,
    value: bool,
}

impl BoolParam {
    /// Current value.
    #[must_use]
    pub const fn value(&self) -> bool {
        self.value
    }
}

/// Integer pair driven by a single slider.
///
/// Only the first element of the declared default seeds the slider, and
/// the extracted pair always repeats the slider value: `(v, v)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairParam {
    name: String,
    help: Option<String>,
    value: i64,
    range: IntRange,
}

impl PairParam {
    /// Current slider value (both pair elements).
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }

    /// Declared domain of the slider.
    #[must_use]
    pub const fn range(&self) -> IntRange {
        self.range
    }
}

/// Enumerated parameter drawn as a select list.
///
/// Holds an ordered `label -> backing value` mapping. Several labels may
/// share a backing value; the default selects the first of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParam {
    name: String,
    help: Option<String>,
    choices: Vec<(String, i64)>,
    selected: usize,
}

impl EnumParam {
    /// The `label -> backing value` mapping in display order.
    #[must_use]
    pub fn choices(&self) -> &[(String, i64)] {
        &self.choices
    }

    /// Label of the selected option.
    #[must_use]
    pub fn selected_label(&self) -> &str {
        self.choices
            .get(self.selected)
            .map_or("", |(label, _)| label.as_str())
    }

    /// Backing value of the selected option.
    #[must_use]
    pub fn backing_value(&self) -> i64 {
        self.choices.get(self.selected).map_or(0, |(_, v)| *v)
    }
}

/// A declared, UI-renderable stage parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "ParamDecl")]
pub enum Param {
    /// Integer slider.
    Int(IntParam),
    /// Boolean checkbox.
    Bool(BoolParam),
    /// Single slider extracted as a symmetric pair.
    Pair(PairParam),
    /// Select over a labelled mapping.
    Enum(EnumParam),
}

impl Param {
    /// Declare an integer parameter.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if the range is malformed
    /// or `value` is not in it.
    pub fn int(
        name: impl Into<String>,
        value: i64,
        range: (i64, i64),
        step: i64,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        let range = IntRange::new(&name, range, step)?;
        range.check_default(&name, value)?;
        Ok(Self::Int(IntParam {
            name,
            help: None,
            value,
            range,
        }))
    }

    /// Declare a boolean parameter.
    #[must_use]
    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self::Bool(BoolParam {
            name: name.into(),
            help: None,
            value,
        })
    }

    /// Declare a paired-integer parameter seeded from `value.0`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if the range is malformed
    /// or `value.0` is not in it.
    pub fn pair(
        name: impl Into<String>,
        value: (i64, i64),
        range: (i64, i64),
        step: i64,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        let range = IntRange::new(&name, range, step)?;
        range.check_default(&name, value.0)?;
        if value.0 != value.1 {
            tracing::debug!(
                param = %name,
                first = value.0,
                second = value.1,
                "pair default is asymmetric; only the first element is used",
            );
        }
        Ok(Self::Pair(PairParam {
            name,
            help: None,
            value: value.0,
            range,
        }))
    }

    /// Declare an enumerated parameter whose default is the first label
    /// mapped to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if the mapping is empty,
    /// repeats a label, or contains no label backed by `value`.
    pub fn choice<I, K>(name: impl Into<String>, value: i64, choices: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        let name = name.into();
        let choices: Vec<(String, i64)> = choices
            .into_iter()
            .map(|(label, backing)| (label.into(), backing))
            .collect();
        if choices.is_empty() {
            return Err(PipelineError::configuration(name, "no choices declared"));
        }
        for (i, (label, _)) in choices.iter().enumerate() {
            if choices[..i].iter().any(|(other, _)| other == label) {
                return Err(PipelineError::configuration(
                    name,
                    format!("choice label `{label}` is declared twice"),
                ));
            }
        }
        let selected = choices
            .iter()
            .position(|(_, backing)| *backing == value)
            .ok_or_else(|| {
                PipelineError::configuration(
                    &name,
                    format!("default value {value} not found in choices"),
                )
            })?;
        Ok(Self::Enum(EnumParam {
            name,
            help: None,
            choices,
            selected,
        }))
    }

    /// Attach help text shown alongside the control.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        let slot = match &mut self {
            Self::Int(p) => &mut p.help,
            Self::Bool(p) => &mut p.help,
            Self::Pair(p) => &mut p.help,
            Self::Enum(p) => &mut p.help,
        };
        *slot = Some(help.into());
        self
    }

    /// Parameter name, also the keyword passed to the operation.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Int(p) => &p.name,
            Self::Bool(p) => &p.name,
            Self::Pair(p) => &p.name,
            Self::Enum(p) => &p.name,
        }
    }

    /// Help text, if any.
    #[must_use]
    pub fn help(&self) -> Option<&str> {
        match self {
            Self::Int(p) => p.help.as_deref(),
            Self::Bool(p) => p.help.as_deref(),
            Self::Pair(p) => p.help.as_deref(),
            Self::Enum(p) => p.help.as_deref(),
        }
    }

    /// Draw the parameter's control into `region` and adopt the value the
    /// toolkit returns, conformed to the declared domain.
    pub fn render<U: Ui + ?Sized>(&mut self, ui: &mut U, region: Region) {
        match self {
            Self::Int(p) => {
                let raw = ui.slider(region, &slider(&p.name, p.help.as_deref(), p.value, p.range));
                p.value = conform_logged(&p.name, p.range, raw);
            }
            Self::Pair(p) => {
                let raw = ui.slider(region, &slider(&p.name, p.help.as_deref(), p.value, p.range));
                p.value = conform_logged(&p.name, p.range, raw);
            }
            Self::Bool(p) => {
                p.value = ui.checkbox(
                    region,
                    &Checkbox {
                        label: &p.name,
                        help: p.help.as_deref(),
                        value: p.value,
                    },
                );
            }
            Self::Enum(p) => {
                let labels: Vec<&str> = p.choices.iter().map(|(label, _)| label.as_str()).collect();
                let key = ui.select(
                    region,
                    &Select {
                        label: &p.name,
                        help: p.help.as_deref(),
                        options: &labels,
                        index: p.selected,
                    },
                );
                match p.choices.iter().position(|(label, _)| *label == key) {
                    Some(index) => p.selected = index,
                    None => tracing::warn!(
                        param = %p.name,
                        key = %key,
                        "toolkit returned an option that was not offered; keeping selection",
                    ),
                }
            }
        }
    }

    /// The keyword argument value for the current state.
    #[must_use]
    pub fn extract(&self) -> Value {
        match self {
            Self::Int(p) => Value::Int(p.value),
            Self::Bool(p) => Value::Bool(p.value),
            Self::Pair(p) => Value::Pair(p.value, p.value),
            Self::Enum(p) => Value::Int(p.backing_value()),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(p) => write!(f, "{}: {}", p.name, p.value),
            Self::Bool(p) => write!(f, "{}: {}", p.name, p.value),
            Self::Pair(p) => write!(f, "{}: {} - {}", p.name, p.value, p.value),
            Self::Enum(p) => write!(f, "{}: {}", p.name, p.selected_label()),
        }
    }
}

const fn slider<'a>(label: &'a str, help: Option<&'a str>, value: i64, range: IntRange) -> Slider<'a> {
    Slider {
        label,
        help,
        value,
        min: range.min,
        max: range.max,
        step: range.step,
    }
}

fn conform_logged(name: &str, range: IntRange, raw: i64) -> i64 {
    let value = range.conform(raw);
    if value != raw {
        tracing::warn!(param = %name, raw, value, "control value outside declared domain; conformed");
    }
    value
}

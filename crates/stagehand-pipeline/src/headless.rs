//! A [`Ui`] without a screen.
//!
//! [`HeadlessUi`] answers every widget call from a [`ControlState`] map
//! keyed by widget identity (`"{container header}.{label}"`), falling back
//! to the widget's pre-selected value, and writes the answer back so the
//! next pass sees it. Images shown during a pass are buffered as
//! [`Panel`]s, one per container, for the caller to write out.
//!
//! A header repeated within one pass gets a `#2`, `#3`, ... suffix so the
//! widgets of two identical stages keep separate identities.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::param::IntRange;
use crate::types::Frame;
use crate::ui::{Checkbox, Region, Select, Slider, Ui};

/// The last value of one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    /// Slider position.
    Int(i64),
    /// Checkbox state.
    Bool(bool),
    /// Selected option label.
    Key(String),
}

impl ControlValue {
    /// Parse a command-line value: `true`/`false`, an integer, or an
    /// option label.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => text
                .parse()
                .map_or_else(|_| Self::Key(text.to_string()), Self::Int),
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Bool(_) => "boolean",
            Self::Key(_) => "option",
        }
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Key(v) => f.write_str(v),
        }
    }
}

/// Widget identity → last value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlState(BTreeMap<String, ControlValue>);

impl ControlState {
    /// An empty state.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ControlValue> {
        self.0.get(key)
    }

    /// Store `value` under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: ControlValue) {
        self.0.insert(key.into(), value);
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ControlValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of stored controls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One image shown during a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Shown {
    /// Caption passed to the image widget.
    pub caption: String,
    /// The frame displayed.
    pub frame: Frame,
}

/// Everything shown inside one container.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    /// Widget-identity prefix: the header, de-duplicated within the pass.
    pub key: String,
    /// Container header.
    pub header: String,
    /// Images in display order.
    pub images: Vec<Shown>,
}

/// A control drawn during the last pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    /// Widget identity.
    pub key: String,
    /// Value the widget answered with.
    pub value: ControlValue,
    /// Human-readable domain, e.g. `1..=255 step 2`.
    pub domain: String,
    /// Help text.
    pub help: Option<String>,
}

/// Headless toolkit backed by a [`ControlState`].
#[derive(Debug, Default)]
pub struct HeadlessUi {
    state: ControlState,
    /// Panel index per issued region id.
    regions: Vec<usize>,
    panels: Vec<Panel>,
    widgets: Vec<Widget>,
}

impl HeadlessUi {
    /// A toolkit with no remembered controls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A toolkit resuming from a saved state.
    #[must_use]
    pub fn with_state(state: ControlState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Remembered control values.
    #[must_use]
    pub const fn state(&self) -> &ControlState {
        &self.state
    }

    /// Override a control; takes effect on the next pass.
    pub fn set(&mut self, key: impl Into<String>, value: ControlValue) {
        self.state.set(key, value);
    }

    /// Forget the layout and images of the previous pass.
    pub fn begin_pass(&mut self) {
        self.regions.clear();
        self.panels.clear();
        self.widgets.clear();
    }

    /// Take the panels buffered since [`begin_pass`](Self::begin_pass).
    pub fn take_panels(&mut self) -> Vec<Panel> {
        std::mem::take(&mut self.panels)
    }

    /// Controls drawn since [`begin_pass`](Self::begin_pass).
    #[must_use]
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    fn issue(&mut self, panel: usize) -> Region {
        let id = u32::try_from(self.regions.len()).unwrap_or(u32::MAX);
        self.regions.push(panel);
        Region::new(id)
    }

    fn panel_mut(&mut self, region: Region) -> Option<&mut Panel> {
        let index = *self.regions.get(region.id() as usize)?;
        self.panels.get_mut(index)
    }

    fn widget_key(&self, region: Region, label: &str) -> String {
        let prefix = self
            .regions
            .get(region.id() as usize)
            .and_then(|&index| self.panels.get(index))
            .map_or("", |panel| panel.key.as_str());
        format!("{prefix}.{label}")
    }

    fn record(&mut self, key: String, value: ControlValue, domain: String, help: Option<&str>) {
        self.state.set(key.clone(), value.clone());
        self.widgets.push(Widget {
            key,
            value,
            domain,
            help: help.map(str::to_string),
        });
    }

    fn stale(key: &str, expected: &str, found: &ControlValue) {
        tracing::warn!(
            key,
            expected,
            found = found.kind(),
            "stored control value has the wrong type; using the default",
        );
    }
}

impl Ui for HeadlessUi {
    fn container(&mut self, header: &str) -> Region {
        let repeats = self.panels.iter().filter(|p| p.header == header).count();
        let key = if repeats == 0 {
            header.to_string()
        } else {
            format!("{header}#{}", repeats + 1)
        };
        self.panels.push(Panel {
            key,
            header: header.to_string(),
            images: Vec::new(),
        });
        self.issue(self.panels.len() - 1)
    }

    fn columns(&mut self, parent: Region, count: usize) -> Vec<Region> {
        let panel = self.regions.get(parent.id() as usize).copied().unwrap_or(0);
        (0..count).map(|_| self.issue(panel)).collect()
    }

    fn slider(&mut self, region: Region, slider: &Slider<'_>) -> i64 {
        let key = self.widget_key(region, slider.label);
        let value = match self.state.get(&key) {
            Some(ControlValue::Int(v)) => {
                let range = IntRange {
                    min: slider.min,
                    max: slider.max.max(slider.min),
                    step: slider.step.max(1),
                };
                let snapped = range.conform(*v);
                if snapped != *v {
                    tracing::warn!(
                        key = %key,
                        stored = *v,
                        value = snapped,
                        "control value moved onto the slider grid"
                    );
                }
                snapped
            }
            Some(other) => {
                Self::stale(&key, "integer", other);
                slider.value
            }
            None => slider.value,
        };
        let domain = format!("{}..={} step {}", slider.min, slider.max, slider.step);
        self.record(key, ControlValue::Int(value), domain, slider.help);
        value
    }

    fn checkbox(&mut self, region: Region, checkbox: &Checkbox<'_>) -> bool {
        let key = self.widget_key(region, checkbox.label);
        let value = match self.state.get(&key) {
            Some(ControlValue::Bool(v)) => *v,
            Some(other) => {
                Self::stale(&key, "boolean", other);
                checkbox.value
            }
            None => checkbox.value,
        };
        self.record(key, ControlValue::Bool(value), "true | false".to_string(), checkbox.help);
        value
    }

    fn select(&mut self, region: Region, select: &Select<'_>) -> String {
        let key = self.widget_key(region, select.label);
        let default = select.options.get(select.index).copied().unwrap_or_default();
        let value = match self.state.get(&key) {
            Some(ControlValue::Key(k)) if select.options.contains(&k.as_str()) => k.clone(),
            Some(other) => {
                Self::stale(&key, "one of the offered options", other);
                default.to_string()
            }
            None => default.to_string(),
        };
        let domain = format!("{} options", select.options.len());
        self.record(key, ControlValue::Key(value.clone()), domain, select.help);
        value
    }

    fn image(&mut self, region: Region, frame: &Frame, caption: &str) {
        match self.panel_mut(region) {
            Some(panel) => panel.images.push(Shown {
                caption: caption.to_string(),
                frame: frame.clone(),
            }),
            None => tracing::warn!(caption, "image shown outside any container; dropped"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::GrayImage;

    fn slider(label: &str, value: i64) -> Slider<'_> {
        Slider {
            label,
            help: None,
            value,
            min: 1,
            max: 255,
            step: 2,
        }
    }

    #[test]
    fn parse_control_values() {
        assert_eq!(ControlValue::parse("42"), ControlValue::Int(42));
        assert_eq!(ControlValue::parse("-3"), ControlValue::Int(-3));
        assert_eq!(ControlValue::parse("true"), ControlValue::Bool(true));
        assert_eq!(
            ControlValue::parse("COLOR_RGB2HSV"),
            ControlValue::Key("COLOR_RGB2HSV".to_string())
        );
    }

    #[test]
    fn slider_falls_back_to_default_and_remembers() {
        let mut ui = HeadlessUi::new();
        let region = ui.container("dilate");
        assert_eq!(ui.slider(region, &slider("kernel", 5)), 5);
        assert_eq!(ui.state().get("dilate.kernel"), Some(&ControlValue::Int(5)));
    }

    #[test]
    fn off_grid_values_snap_down_before_recording() {
        let mut ui = HeadlessUi::new();
        ui.set("dilate.kernel", ControlValue::Int(4));
        let region = ui.container("dilate");
        assert_eq!(ui.slider(region, &slider("kernel", 5)), 3);
        assert_eq!(ui.state().get("dilate.kernel"), Some(&ControlValue::Int(3)));
        assert_eq!(ui.widgets()[0].value, ControlValue::Int(3));
    }

    #[test]
    fn overrides_apply_and_are_clamped() {
        let mut ui = HeadlessUi::new();
        ui.set("dilate.kernel", ControlValue::Int(9));
        ui.set("dilate.iterations", ControlValue::Int(900));
        let region = ui.container("dilate");
        assert_eq!(ui.slider(region, &slider("kernel", 5)), 9);
        assert_eq!(ui.slider(region, &slider("iterations", 1)), 255);
    }

    #[test]
    fn values_persist_between_passes() {
        let mut ui = HeadlessUi::new();
        ui.set("Canny.L2gradient", ControlValue::Bool(true));
        for _ in 0..2 {
            ui.begin_pass();
            let region = ui.container("Canny");
            let cols = ui.columns(region, 3);
            let value = ui.checkbox(
                cols[2],
                &Checkbox {
                    label: "L2gradient",
                    help: None,
                    value: false,
                },
            );
            assert!(value);
        }
    }

    #[test]
    fn select_rejects_unknown_keys() {
        let mut ui = HeadlessUi::new();
        ui.set("cvtColor.code", ControlValue::Key("NOPE".to_string()));
        let region = ui.container("cvtColor");
        let options = ["A", "B"];
        let select = Select {
            label: "code",
            help: None,
            options: &options,
            index: 1,
        };
        assert_eq!(ui.select(region, &select), "B");
        ui.set("cvtColor.code", ControlValue::Key("A".to_string()));
        assert_eq!(ui.select(region, &select), "A");
    }

    #[test]
    fn wrong_type_uses_default() {
        let mut ui = HeadlessUi::new();
        ui.set("dilate.kernel", ControlValue::Bool(true));
        let region = ui.container("dilate");
        assert_eq!(ui.slider(region, &slider("kernel", 5)), 5);
    }

    #[test]
    fn repeated_headers_get_distinct_keys() {
        let mut ui = HeadlessUi::new();
        let first = ui.container("dilate");
        let second = ui.container("dilate");
        ui.slider(first, &slider("kernel", 3));
        ui.slider(second, &slider("kernel", 7));
        assert_eq!(ui.state().get("dilate.kernel"), Some(&ControlValue::Int(3)));
        assert_eq!(ui.state().get("dilate#2.kernel"), Some(&ControlValue::Int(7)));
    }

    #[test]
    fn images_are_buffered_per_container() {
        let mut ui = HeadlessUi::new();
        let region = ui.container("gray");
        let cols = ui.columns(region, 3);
        let frame = Frame::from(GrayImage::new(2, 2));
        ui.image(cols[0], &frame, "gray input");
        ui.image(cols[1], &frame, "gray output");
        let panels = ui.take_panels();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].header, "gray");
        let captions: Vec<&str> = panels[0].images.iter().map(|s| s.caption.as_str()).collect();
        assert_eq!(captions, vec!["gray input", "gray output"]);
        assert!(ui.take_panels().is_empty());
    }

    #[test]
    fn state_serializes_as_flat_map() {
        let mut state = ControlState::new();
        state.set("Canny.threshold1", ControlValue::Int(50));
        state.set("Canny.L2gradient", ControlValue::Bool(false));
        state.set("cvtColor.code", ControlValue::Key("COLOR_RGB2GRAY".to_string()));
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(
            json,
            r#"{"Canny.L2gradient":false,"Canny.threshold1":50,"cvtColor.code":"COLOR_RGB2GRAY"}"#
        );
        let back: ControlState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}

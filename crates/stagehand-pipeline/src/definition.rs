//! Declarative pipeline definitions.
//!
//! A definition lists stages by operation kind, each with a parameter list
//! written as JSON:
//!
//! ```json
//! {
//!   "stages": [
//!     { "operation": "cvt_color",
//!       "params": [{ "kind": "enum", "name": "code", "value": 7, "choices": "color_codes" }] },
//!     { "operation": "dilate", "label": "grow",
//!       "params": [
//!         { "kind": "pair", "name": "kernel", "value": [5, 5], "range": [1, 255], "step": 2 },
//!         { "kind": "int", "name": "iterations", "value": 1, "range": [1, 10] }
//!       ] }
//!   ]
//! }
//! ```
//!
//! Objects in a parameter list must be valid declarations. Anything else
//! (a bare number, a string) is kept as an unrecognized entry and makes the
//! stage fail when it runs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::color::ColorCatalog;
use crate::operation::OperationKind;
use crate::param::Param;
use crate::pipeline::Pipeline;
use crate::stage::{ParamEntry, Stage};
use crate::types::PipelineError;

/// Name under which enum declarations reference the color-code catalog.
pub const COLOR_CODES: &str = "color_codes";

const fn default_step() -> i64 {
    1
}

/// Choices of an enum declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Choices {
    /// A named catalog; only `"color_codes"` is known.
    Named(String),
    /// Explicit `[label, value]` pairs in display order.
    Listed(Vec<(String, i64)>),
}

/// Serialized form of a [`Param`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamDecl {
    /// Integer slider.
    Int {
        name: String,
        value: i64,
        range: (i64, i64),
        #[serde(default = "default_step")]
        step: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        help: Option<String>,
    },
    /// Checkbox.
    Bool {
        name: String,
        value: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        help: Option<String>,
    },
    /// Single slider extracted as a pair.
    Pair {
        name: String,
        value: (i64, i64),
        range: (i64, i64),
        #[serde(default = "default_step")]
        step: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        help: Option<String>,
    },
    /// Select over labelled backing values.
    Enum {
        name: String,
        value: i64,
        choices: Choices,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        help: Option<String>,
    },
}

impl ParamDecl {
    /// Build the declared parameter.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for an invalid domain or
    /// default, or an unknown catalog name.
    pub fn into_param(self, catalog: &ColorCatalog) -> Result<Param, PipelineError> {
        let (param, help) = match self {
            Self::Int {
                name,
                value,
                range,
                step,
                help,
            } => (Param::int(name, value, range, step)?, help),
            Self::Bool { name, value, help } => (Param::boolean(name, value), help),
            Self::Pair {
                name,
                value,
                range,
                step,
                help,
            } => (Param::pair(name, value, range, step)?, help),
            Self::Enum {
                name,
                value,
                choices,
                help,
            } => {
                let param = match choices {
                    Choices::Listed(list) => Param::choice(name, value, list)?,
                    Choices::Named(catalog_name) if catalog_name == COLOR_CODES => {
                        Param::choice(name, value, catalog.entries().iter().cloned())?
                    }
                    Choices::Named(other) => {
                        return Err(PipelineError::configuration(
                            name,
                            format!("unknown choice catalog `{other}`"),
                        ));
                    }
                };
                (param, help)
            }
        };
        Ok(match help {
            Some(help) => param.with_help(help),
            None => param,
        })
    }
}

impl From<Param> for ParamDecl {
    fn from(param: Param) -> Self {
        let name = param.name().to_string();
        let help = param.help().map(ToString::to_string);
        match param {
            Param::Int(p) => Self::Int {
                name,
                value: p.value(),
                range: (p.range().min, p.range().max),
                step: p.range().step,
                help,
            },
            Param::Bool(p) => Self::Bool {
                name,
                value: p.value(),
                help,
            },
            Param::Pair(p) => Self::Pair {
                name,
                value: (p.value(), p.value()),
                range: (p.range().min, p.range().max),
                step: p.range().step,
                help,
            },
            Param::Enum(p) => Self::Enum {
                name,
                value: p.backing_value(),
                choices: Choices::Listed(p.choices().to_vec()),
                help,
            },
        }
    }
}

/// One stage of a [`PipelineDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Built-in operation to run.
    pub operation: OperationKind,
    /// Display label overriding the operation name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Parameter declarations, kept raw until the stage is built.
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
}

impl StageDefinition {
    /// Build the stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for a malformed declaration
    /// object or duplicate parameter names.
    pub fn build(&self, catalog: &ColorCatalog) -> Result<Stage, PipelineError> {
        let stage_name = self.label.as_deref().unwrap_or_else(|| self.operation.label());
        let entries = self
            .params
            .iter()
            .enumerate()
            .map(|(index, raw)| -> Result<ParamEntry, PipelineError> {
                if !raw.is_object() {
                    return Ok(ParamEntry::Unrecognized(raw.clone()));
                }
                let decl: ParamDecl = serde_json::from_value(raw.clone()).map_err(|e| {
                    PipelineError::configuration(stage_name, format!("parameter {index}: {e}"))
                })?;
                decl.into_param(catalog).map(ParamEntry::Declared)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let stage = Stage::with_entries(Arc::new(self.operation), entries)?;
        Ok(match &self.label {
            Some(label) => stage.with_label(label),
            None => stage,
        })
    }
}

/// A pipeline as JSON: an ordered list of stage definitions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Stages, in order.
    pub stages: Vec<StageDefinition>,
}

impl PipelineDefinition {
    /// Parse a definition from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if the text is not a valid
    /// definition.
    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(text)
            .map_err(|e| PipelineError::configuration("pipeline definition", e.to_string()))
    }

    /// Render the definition as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if serialization fails.
    pub fn to_json(&self) -> Result<String, PipelineError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::configuration("pipeline definition", e.to_string()))
    }

    /// Describe an existing pipeline built from built-in operations.
    ///
    /// Parameters are written with their current values as defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for a stage whose operation
    /// is not built in.
    pub fn describe(pipeline: &Pipeline) -> Result<Self, PipelineError> {
        let stages = pipeline
            .stages()
            .iter()
            .map(|stage| -> Result<StageDefinition, PipelineError> {
                let operation = OperationKind::from_label(stage.operation_name()).ok_or_else(|| {
                    PipelineError::configuration(stage.name(), "not a built-in operation")
                })?;
                let label = (stage.name() != stage.operation_name()).then(|| stage.name().to_string());
                let params = stage
                    .entries()
                    .iter()
                    .map(|entry| match entry {
                        ParamEntry::Declared(param) => serde_json::to_value(param)
                            .map_err(|e| PipelineError::configuration(param.name(), e.to_string())),
                        ParamEntry::Unrecognized(raw) => Ok(raw.clone()),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(StageDefinition {
                    operation,
                    label,
                    params,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { stages })
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first stage that fails to build.
    pub fn build(&self, catalog: &ColorCatalog) -> Result<Pipeline, PipelineError> {
        self.stages.iter().map(|stage| stage.build(catalog)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::param::Value;
    use crate::presets;

    const DEFINITION: &str = r#"{
        "stages": [
            { "operation": "cvt_color",
              "params": [{ "kind": "enum", "name": "code", "value": 7, "choices": "color_codes" }] },
            { "operation": "dilate", "label": "grow",
              "params": [
                { "kind": "pair", "name": "kernel", "value": [5, 5], "range": [1, 255], "step": 2,
                  "help": "Kernel size" },
                { "kind": "int", "name": "iterations", "value": 1, "range": [1, 10] }
              ] },
            { "operation": "canny",
              "params": [
                { "kind": "int", "name": "threshold1", "value": 50, "range": [1, 255] },
                { "kind": "int", "name": "threshold2", "value": 150, "range": [1, 255] },
                { "kind": "bool", "name": "L2gradient", "value": true }
              ] }
        ]
    }"#;

    #[test]
    fn builds_stages_in_order() {
        let pipeline = PipelineDefinition::from_json(DEFINITION)
            .unwrap()
            .build(&ColorCatalog::builtin())
            .unwrap();
        let names: Vec<&str> = pipeline.stages().iter().map(Stage::name).collect();
        assert_eq!(names, vec!["cvtColor", "grow", "Canny"]);
        let grow = &pipeline.stages()[1];
        assert_eq!(grow.operation_name(), "dilate");
        assert_eq!(grow.param("kernel").unwrap().help(), Some("Kernel size"));
        let canny = pipeline.stages()[2].kwargs().unwrap();
        assert_eq!(canny.get("L2gradient"), Some(&Value::Bool(true)));
    }

    #[test]
    fn non_object_entries_fail_at_run_time() {
        let definition = PipelineDefinition::from_json(
            r#"{ "stages": [{ "operation": "dilate", "params": [5] }] }"#,
        )
        .unwrap();
        let pipeline = definition.build(&ColorCatalog::builtin()).unwrap();
        assert!(matches!(
            pipeline.stages()[0].validate(),
            Err(PipelineError::InvalidParameter { index: 0, .. })
        ));
    }

    #[test]
    fn malformed_declaration_is_configuration_error() {
        let definition = PipelineDefinition::from_json(
            r#"{ "stages": [{ "operation": "dilate", "params": [{ "kind": "slider" }] }] }"#,
        )
        .unwrap();
        assert!(matches!(
            definition.build(&ColorCatalog::builtin()),
            Err(PipelineError::Configuration { .. })
        ));
    }

    #[test]
    fn enum_default_missing_from_listed_choices_is_configuration_error() {
        let definition = PipelineDefinition::from_json(
            r#"{ "stages": [{ "operation": "cvt_color", "params": [
                { "kind": "enum", "name": "code", "value": 3, "choices": [["A", 1], ["B", 2]] }
            ] }] }"#,
        )
        .unwrap();
        assert!(matches!(
            definition.build(&ColorCatalog::builtin()),
            Err(PipelineError::Configuration { .. })
        ));
    }

    #[test]
    fn unknown_catalog_is_configuration_error() {
        let decl = ParamDecl::Enum {
            name: "code".into(),
            value: 0,
            choices: Choices::Named("fonts".into()),
            help: None,
        };
        assert!(decl.into_param(&ColorCatalog::builtin()).is_err());
    }

    #[test]
    fn unknown_operation_is_rejected() {
        assert!(
            PipelineDefinition::from_json(r#"{ "stages": [{ "operation": "erode" }] }"#).is_err()
        );
    }

    #[test]
    fn describe_then_build_reproduces_presets() {
        let catalog = ColorCatalog::builtin();
        let original = presets::reference_pipeline(&catalog).unwrap();
        let json = PipelineDefinition::describe(&original).unwrap().to_json().unwrap();
        let rebuilt = PipelineDefinition::from_json(&json).unwrap().build(&catalog).unwrap();
        assert_eq!(rebuilt.len(), original.len());
        for (a, b) in original.stages().iter().zip(rebuilt.stages()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.entries(), b.entries());
        }
    }

    #[test]
    fn param_serializes_as_declaration() {
        let param = Param::pair("ksize", (5, 5), (1, 255), 2).unwrap();
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "pair", "name": "ksize", "value": [5, 5], "range": [1, 255], "step": 2
            })
        );
    }
}

//! Stages: a native operation bound to an ordered list of parameters.

use std::fmt;
use std::sync::Arc;

use crate::kwargs::Kwargs;
use crate::operation::Operation;
use crate::param::Param;
use crate::types::{Frame, PipelineError};

/// One element of a stage's parameter list.
///
/// Lists built in code only ever hold [`ParamEntry::Declared`]. Lists read
/// from a pipeline definition keep elements that are not parameter
/// declarations as [`ParamEntry::Unrecognized`] so the stage can refuse
/// to run.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamEntry {
    /// A declared parameter.
    Declared(Param),
    /// Something that is not a parameter declaration.
    Unrecognized(serde_json::Value),
}

impl From<Param> for ParamEntry {
    fn from(param: Param) -> Self {
        Self::Declared(param)
    }
}

/// A native operation plus its bound, UI-editable parameters.
#[derive(Clone)]
pub struct Stage {
    label: Option<String>,
    operation: Arc<dyn Operation>,
    entries: Vec<ParamEntry>,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("label", &self.label)
            .field("operation", &self.operation.name())
            .field("entries", &self.entries)
            .finish()
    }
}

impl Stage {
    /// Bind `operation` to a list of declared parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if two parameters share a
    /// name.
    pub fn new(operation: impl Operation + 'static, params: Vec<Param>) -> Result<Self, PipelineError> {
        Self::with_entries(
            Arc::new(operation),
            params.into_iter().map(ParamEntry::Declared).collect(),
        )
    }

    /// Bind a shared operation to a raw entry list.
    ///
    /// Unrecognized entries are accepted here and rejected by
    /// [`Stage::run`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if two declared parameters
    /// share a name.
    pub fn with_entries(
        operation: Arc<dyn Operation>,
        entries: Vec<ParamEntry>,
    ) -> Result<Self, PipelineError> {
        let mut seen: Vec<&str> = Vec::new();
        for entry in &entries {
            if let ParamEntry::Declared(param) = entry {
                if seen.contains(&param.name()) {
                    return Err(PipelineError::configuration(
                        operation.name(),
                        format!("parameter `{}` is declared twice", param.name()),
                    ));
                }
                seen.push(param.name());
            }
        }
        Ok(Self {
            label: None,
            operation,
            entries,
        })
    }

    /// Display the stage under `label` instead of the operation name.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Display name: the label if set, otherwise the operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| self.operation.name())
    }

    /// Name of the wrapped operation.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        self.operation.name()
    }

    /// The raw parameter list.
    #[must_use]
    pub fn entries(&self) -> &[ParamEntry] {
        &self.entries
    }

    /// Declared parameters, in order.
    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.entries.iter().filter_map(|entry| match entry {
            ParamEntry::Declared(param) => Some(param),
            ParamEntry::Unrecognized(_) => None,
        })
    }

    /// Declared parameters, mutably.
    pub fn params_mut(&mut self) -> impl Iterator<Item = &mut Param> {
        self.entries.iter_mut().filter_map(|entry| match entry {
            ParamEntry::Declared(param) => Some(param),
            ParamEntry::Unrecognized(_) => None,
        })
    }

    /// Look up a declared parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params().find(|param| param.name() == name)
    }

    /// Check that every entry is a declared parameter.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] for the first entry
    /// that is not.
    pub fn validate(&self) -> Result<(), PipelineError> {
        match self
            .entries
            .iter()
            .enumerate()
            .find_map(|(index, entry)| match entry {
                ParamEntry::Unrecognized(value) => Some((index, value)),
                ParamEntry::Declared(_) => None,
            }) {
            None => Ok(()),
            Some((index, value)) => Err(PipelineError::InvalidParameter {
                stage: self.name().to_string(),
                index,
                found: value.to_string(),
            }),
        }
    }

    /// Extract every parameter into a keyword map keyed by name.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] if the list holds an
    /// unrecognized entry.
    pub fn kwargs(&self) -> Result<Kwargs, PipelineError> {
        self.validate()?;
        Ok(self
            .params()
            .map(|param| (param.name(), param.extract()))
            .collect())
    }

    /// Invoke the operation on `input` with the current parameter values.
    ///
    /// The result is returned unmodified; operation errors pass through as
    /// [`PipelineError::Operation`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] for an unrecognized
    /// entry, or the operation's own error.
    pub fn run(&self, input: &Frame) -> Result<Frame, PipelineError> {
        let kwargs = self.kwargs()?;
        Ok(self.operation.call(input, &kwargs)?)
    }
}
